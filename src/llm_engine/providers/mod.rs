//! Reasoning provider implementations
//!
//! Each provider implements the ReasoningProvider trait for a specific backend

pub mod gemini_provider;
pub mod ollama_provider;

pub use gemini_provider::{GeminiConfig, GeminiProvider};
pub use ollama_provider::{OllamaConfig, OllamaProvider};
