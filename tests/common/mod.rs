use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use r2d2::Pool;

use nl_teller::agents::PromptStore;
use nl_teller::catalog::SchemaCatalog;
use nl_teller::db::executor::QueryExecutor;
use nl_teller::db::pool::BankDbConnectionManager;
use nl_teller::db::{bootstrap, DbPool};
use nl_teller::llm::{ChatModel, LlmError, LlmManager};
use nl_teller::pipeline::Orchestrator;
use nl_teller::validate::SqlValidator;

pub fn unique_temp_db(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir.join("bank.db")
}

pub fn seeded_pool(prefix: &str) -> DbPool {
    let db_path = unique_temp_db(prefix);
    let manager = BankDbConnectionManager::open(&db_path.to_string_lossy())
        .expect("database should open");
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .expect("pool should build");
    bootstrap::initialize(&pool).expect("bootstrap should succeed");
    pool
}

/// Chat backend that replays a fixed script and records every prompt it saw.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<&str, &str>>) -> (Self, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let model = Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Arc::clone(&prompts),
        };
        (model, prompts)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts
            .lock()
            .expect("prompt log lock")
            .push(prompt.to_string());
        match self.responses.lock().expect("script lock").pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::ConnectionError(message)),
            None => Err(LlmError::ResponseError("script exhausted".to_string())),
        }
    }
}

/// Chat backend that must never be reached; the raw-SQL path bypasses the LLM.
pub struct UnreachableModel;

#[async_trait]
impl ChatModel for UnreachableModel {
    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        panic!("the LLM must not be invoked on this path");
    }
}

pub fn orchestrator_with(pool: DbPool, model: Box<dyn ChatModel + Send + Sync>) -> Orchestrator {
    let catalog = Arc::new(SchemaCatalog::banking());
    let validator = SqlValidator::new(Arc::clone(&catalog));
    let executor = QueryExecutor::new(pool, 30, 1000);
    Orchestrator::new(
        catalog,
        validator,
        executor,
        Arc::new(LlmManager::from_model(model)),
        Arc::new(PromptStore::builtin_only()),
        2,
    )
}

/// The SQL-generation prompt is the only one that mentions the generator role;
/// counting it counts SQL agent invocations.
pub fn count_sql_prompts(prompts: &Arc<Mutex<Vec<String>>>) -> usize {
    prompts
        .lock()
        .expect("prompt log lock")
        .iter()
        .filter(|p| p.contains("expert SQL generator"))
        .count()
}
