//! Reasoning engine for coaching advice
//!
//! Supports two backends:
//! - Gemini REST API (`generateContent` with a response schema)
//! - Ollama API (requires running Ollama server)

pub mod provider;
pub mod providers;

use std::sync::Arc;

use crate::config::ReasoningConfig;

pub use provider::{
    CoachAnalysis, CoachingPrompt, ReasoningBackend, ReasoningError, ReasoningProvider,
};
use providers::{GeminiProvider, OllamaProvider};

/// Build the provider selected in the configuration
pub fn create_provider(
    config: &ReasoningConfig,
    api_key: &str,
) -> Result<Arc<dyn ReasoningProvider>, ReasoningError> {
    let provider: Arc<dyn ReasoningProvider> = match config.backend {
        ReasoningBackend::Gemini => Arc::new(GeminiProvider::new(config.into(), api_key)?),
        ReasoningBackend::Ollama => Arc::new(OllamaProvider::new(config.into())?),
    };
    log::info!(
        "Reasoning provider: {} (model: {})",
        provider.provider_name(),
        config.model
    );
    Ok(provider)
}
