use std::path::PathBuf;
use std::sync::Arc;

use crate::agents::PromptStore;
use crate::catalog::SchemaCatalog;
use crate::config::AppConfig;
use crate::db::executor::QueryExecutor;
use crate::db::DbPool;
use crate::llm::LlmManager;
use crate::pipeline::Orchestrator;
use crate::validate::{SqlValidator, ValidatorLimits};

/// Shared application state for the web server. Everything in here is
/// immutable after startup and safe for concurrent reads.
pub struct AppState {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub catalog: Arc<SchemaCatalog>,
    pub orchestrator: Orchestrator,
    pub ai_ready: bool,
}

impl AppState {
    pub fn new(config: AppConfig, db_pool: DbPool, llm: LlmManager) -> Self {
        let catalog = Arc::new(SchemaCatalog::banking());
        let llm = Arc::new(llm);
        let prompts = Arc::new(PromptStore::new(Some(PathBuf::from(&config.prompts_dir))));

        let validator = SqlValidator::with_limits(
            Arc::clone(&catalog),
            ValidatorLimits {
                max_query_length: config.query.max_query_length,
                default_limit: config.query.default_limit,
                max_limit: config.query.max_limit,
            },
        );
        let executor = QueryExecutor::new(
            db_pool.clone(),
            config.query.timeout_seconds,
            config.query.max_result_rows,
        );
        let orchestrator = Orchestrator::new(
            Arc::clone(&catalog),
            validator,
            executor,
            llm,
            prompts,
            config.query.max_retries,
        );

        Self {
            config,
            db_pool,
            catalog,
            orchestrator,
            ai_ready: true,
        }
    }
}
