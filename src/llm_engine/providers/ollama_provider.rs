//! Ollama API provider
//!
//! Connects to a running Ollama server (default: localhost:11434) and asks
//! for a structured answer through the `format` JSON schema.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ReasoningConfig, OLLAMA_BASE_URL, DEFAULT_OLLAMA_REASONING_MODEL};
use crate::llm_engine::provider::{
    json_schema, parse_analysis, CoachAnalysis, CoachingPrompt, ReasoningError, ReasoningProvider,
};

/// Ollama API message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl OllamaMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    format: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Ollama chat response
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_OLLAMA_REASONING_MODEL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl From<&ReasoningConfig> for OllamaConfig {
    fn from(config: &ReasoningConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Ollama reasoning provider
pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, ReasoningError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReasoningError::ProviderUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, prompt: &CoachingPrompt) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                OllamaMessage::new("system", &prompt.system_instruction),
                OllamaMessage::new("user", &prompt.context),
            ],
            stream: false,
            format: json_schema(),
            options: Some(OllamaOptions {
                temperature: Some(0.4),
            }),
        }
    }
}

#[async_trait]
impl ReasoningProvider for OllamaProvider {
    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    async fn analyze(&self, prompt: &CoachingPrompt) -> Result<CoachAnalysis, ReasoningError> {
        let url = format!("{}/api/chat", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ReasoningError::ProviderUnavailable(format!("Cannot connect to Ollama: {}", e))
                } else {
                    ReasoningError::RequestFailed(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReasoningError::RequestFailed(format!(
                "Ollama returned error: {}",
                error_text
            )));
        }

        let ollama_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::InvalidResponse(format!("Invalid response: {}", e)))?;

        if !ollama_response.done {
            log::debug!("Ollama response not marked done, parsing what was returned");
        }

        parse_analysis(&ollama_response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let provider = OllamaProvider::new(OllamaConfig::default()).unwrap();
        let request = provider.build_request(&CoachingPrompt {
            system_instruction: "coach".to_string(),
            context: "John: no way".to_string(),
        });
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], DEFAULT_OLLAMA_REASONING_MODEL);
        assert_eq!(value["stream"], false);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "John: no way");
        assert_eq!(value["format"]["type"], "object");
    }

    #[test]
    fn test_response_content_is_parsed() {
        let body = r#"{"model":"llama3.2","message":{"role":"assistant","content":"{\"category\":\"emotion\",\"observation\":\"tense\",\"suggestion\":\"Breathe. Lower your voice.\",\"detected_speakers\":[]}"},"done":true}"#;
        let response: OllamaChatResponse = serde_json::from_str(body).unwrap();
        let analysis = parse_analysis(&response.message.content).unwrap();
        assert_eq!(analysis.suggestion, "Breathe. Lower your voice.");
    }

    #[test]
    fn test_config_from_reasoning_config() {
        let reasoning = ReasoningConfig::for_backend(crate::llm_engine::ReasoningBackend::Ollama);
        let config = OllamaConfig::from(&reasoning);
        assert_eq!(config.base_url, OLLAMA_BASE_URL);
    }
}
