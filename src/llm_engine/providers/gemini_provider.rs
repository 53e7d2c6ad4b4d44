//! Gemini REST provider
//!
//! Calls `models/{model}:generateContent` with a strict `responseSchema` so
//! the reply is a single JSON coaching card.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ReasoningConfig, DEFAULT_GEMINI_REASONING_MODEL, GEMINI_API_BASE_URL};
use crate::llm_engine::provider::{
    gemini_response_schema, parse_analysis, CoachAnalysis, CoachingPrompt, ReasoningError,
    ReasoningProvider,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    /// Set on thought-summary parts, which are not part of the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_API_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_REASONING_MODEL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl From<&ReasoningConfig> for GeminiConfig {
    fn from(config: &ReasoningConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

pub struct GeminiProvider {
    config: GeminiConfig,
    api_key: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, api_key: impl Into<String>) -> Result<Self, ReasoningError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ReasoningError::AuthenticationFailed("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReasoningError::ProviderUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.config.model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.config.base_url, model)
    }

    fn build_request(prompt: &CoachingPrompt) -> GenerateContentRequest {
        GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(prompt.system_instruction.clone()),
                    thought: None,
                }],
            },
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.context.clone()),
                    thought: None,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: gemini_response_schema(),
            },
        }
    }
}

/// Concatenate the answer text of the first candidate, skipping thoughts
fn answer_text(response: GenerateContentResponse) -> Result<String, ReasoningError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ReasoningError::InvalidResponse("no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| part.thought != Some(true))
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ReasoningError::InvalidResponse(format!(
            "empty answer (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl ReasoningProvider for GeminiProvider {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze(&self, prompt: &CoachingPrompt) -> Result<CoachAnalysis, ReasoningError> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ReasoningError::ProviderUnavailable(format!("Cannot reach Gemini: {}", e))
                } else {
                    ReasoningError::RequestFailed(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(ReasoningError::AuthenticationFailed(format!("Gemini returned {}", status)));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReasoningError::RequestFailed(format!(
                "Gemini returned {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::InvalidResponse(format!("Invalid response: {}", e)))?;

        let text = answer_text(body)?;
        debug!("Gemini coaching answer: {} chars", text.len());
        parse_analysis(&text)
    }
}
