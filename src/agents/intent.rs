use std::sync::Arc;

use tracing::debug;

use crate::agents::prompts::{PromptName, PromptStore};
use crate::llm::{LlmError, LlmManager};

/// First agent in the pipeline: turns the user's question into a structured
/// one-paragraph intent description the SQL agent can work from.
pub struct IntentAgent {
    llm: Arc<LlmManager>,
    prompts: Arc<PromptStore>,
}

impl IntentAgent {
    pub fn new(llm: Arc<LlmManager>, prompts: Arc<PromptStore>) -> Self {
        Self { llm, prompts }
    }

    pub async fn run(&self, user_query: &str) -> Result<String, LlmError> {
        let prompt = self
            .prompts
            .load(PromptName::Intent)
            .replace("{user_query}", user_query);

        let intent = self.llm.complete(&prompt).await?;
        let intent = intent.trim().to_string();
        debug!(%intent, "interpreted intent");
        Ok(intent)
    }
}
