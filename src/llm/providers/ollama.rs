use crate::config::LlmConfig;
use crate::llm::{ChatModel, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Local Ollama backend, mainly for development without an API key.
pub struct OllamaChatProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaChatProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434/api/generate".to_string());

        Ok(Self {
            client: reqwest::Client::new(),
            api_url,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChatProvider {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(api_url = %self.api_url, model = %self.model, "sending Ollama request");

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            temperature: 0.0,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LlmError::ResponseError(format!(
                "Ollama responded with status code: {}",
                response.status()
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        Ok(ollama_response.response)
    }
}
