pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LlmError {
    ConnectionError(String),
    ResponseError(String),
    ConfigError(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::ConnectionError(msg) => write!(f, "LLM connection error: {}", msg),
            LlmError::ResponseError(msg) => write!(f, "LLM response error: {}", msg),
            LlmError::ConfigError(msg) => write!(f, "LLM configuration error: {}", msg),
        }
    }
}

impl Error for LlmError {}

/// A chat completion backend. Prompts are fully rendered by the agents;
/// providers only move text. Temperature is pinned to zero so retries of the
/// same request are repeatable.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct LlmManager {
    model: Box<dyn ChatModel + Send + Sync>,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let model: Box<dyn ChatModel + Send + Sync> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteChatProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaChatProvider::new(config)?),
            other => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    other
                )))
            }
        };

        Ok(Self { model })
    }

    /// Wrap an already-built backend; tests use this to inject scripted models.
    pub fn from_model(model: Box<dyn ChatModel + Send + Sync>) -> Self {
        Self { model }
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.model.complete(prompt).await
    }
}
