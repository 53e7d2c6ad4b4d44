//! Reasoning provider trait and types
//!
//! Defines the common interface for the backends that turn a transcript
//! window into one coaching card (Gemini REST, Ollama)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::coach::types::AdviceCategory;

/// Error types for reasoning calls
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReasoningError {
    /// Backend not reachable (Ollama not running, DNS, refused)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// API key missing or rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    /// Request failed (network, timeout, non-success status)
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// Response did not match the coaching schema
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Which backend serves reasoning requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningBackend {
    Gemini,
    Ollama,
}

impl fmt::Display for ReasoningBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasoningBackend::Gemini => write!(f, "gemini"),
            ReasoningBackend::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for ReasoningBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ReasoningBackend::Gemini),
            "ollama" => Ok(ReasoningBackend::Ollama),
            other => Err(format!("Unknown reasoning provider: {}", other)),
        }
    }
}

/// One reasoning request: the coach instruction plus the transcript window
#[derive(Debug, Clone, PartialEq)]
pub struct CoachingPrompt {
    pub system_instruction: String,
    pub context: String,
}

/// Structured answer from the reasoning agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachAnalysis {
    pub category: AdviceCategory,
    #[serde(default)]
    pub observation: String,
    pub suggestion: String,
    #[serde(default)]
    pub detected_speakers: Vec<String>,
    #[serde(default)]
    pub speaker: Option<String>,
}

/// Parse the model's JSON text into a [`CoachAnalysis`].
///
/// Tolerates a markdown code fence around the object. An empty suggestion is
/// rejected since there would be nothing to show.
pub fn parse_analysis(raw: &str) -> Result<CoachAnalysis, ReasoningError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let analysis: CoachAnalysis = serde_json::from_str(body)
        .map_err(|e| ReasoningError::InvalidResponse(format!("{} in {:?}", e, truncate(body, 120))))?;

    if analysis.suggestion.trim().is_empty() {
        return Err(ReasoningError::InvalidResponse("empty suggestion".to_string()));
    }
    Ok(analysis)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

const CATEGORIES: [&str; 4] = ["negotiation", "tone", "argument", "emotion"];

/// Response schema in the OpenAPI dialect used by Gemini `responseSchema`
pub fn gemini_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "category": { "type": "STRING", "enum": CATEGORIES },
            "observation": { "type": "STRING" },
            "suggestion": { "type": "STRING" },
            "detected_speakers": { "type": "ARRAY", "items": { "type": "STRING" } },
            "speaker": { "type": "STRING" }
        },
        "required": ["category", "observation", "suggestion", "detected_speakers"]
    })
}

/// The same schema as plain JSON Schema, for Ollama structured outputs
pub fn json_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "category": { "type": "string", "enum": CATEGORIES },
            "observation": { "type": "string" },
            "suggestion": { "type": "string" },
            "detected_speakers": { "type": "array", "items": { "type": "string" } },
            "speaker": { "type": "string" }
        },
        "required": ["category", "observation", "suggestion", "detected_speakers"]
    })
}

/// Common interface for reasoning backends
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Analyze a transcript window and return one coaching card
    async fn analyze(&self, prompt: &CoachingPrompt) -> Result<CoachAnalysis, ReasoningError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analysis() {
        let analysis = parse_analysis(
            r#"{"category":"tone","observation":"John sounds impatient","suggestion":"Slow down. Ask one question.","detected_speakers":["User","John"],"speaker":"Coach"}"#,
        )
        .unwrap();
        assert_eq!(analysis.category, AdviceCategory::Tone);
        assert_eq!(analysis.detected_speakers, vec!["User", "John"]);
        assert_eq!(analysis.speaker.as_deref(), Some("Coach"));
    }

    #[test]
    fn test_parse_analysis_with_fence_and_defaults() {
        let analysis =
            parse_analysis("```json\n{\"category\":\"argument\",\"suggestion\":\"Quote the figures.\"}\n```").unwrap();
        assert_eq!(analysis.category, AdviceCategory::Argument);
        assert!(analysis.detected_speakers.is_empty());
        assert!(analysis.speaker.is_none());
    }

    #[test]
    fn test_parse_analysis_rejects_bad_payloads() {
        assert!(matches!(
            parse_analysis("sure, here is my advice"),
            Err(ReasoningError::InvalidResponse(_))
        ));
        assert!(parse_analysis(r#"{"category":"humor","suggestion":"x"}"#).is_err());
        assert!(parse_analysis(r#"{"category":"tone","suggestion":"  "}"#).is_err());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Ollama".parse::<ReasoningBackend>().unwrap(), ReasoningBackend::Ollama);
        assert!("openai".parse::<ReasoningBackend>().is_err());
        assert_eq!(ReasoningBackend::Gemini.to_string(), "gemini");
    }

    #[test]
    fn test_schemas_agree_on_required_fields() {
        assert_eq!(gemini_response_schema()["required"], json_schema()["required"]);
    }
}
