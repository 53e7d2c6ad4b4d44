//! Runtime configuration
//!
//! Defaults match the live coaching setup; [`CoachConfig::from_env`] applies
//! environment overrides on top and validates the result.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::coach::throttle::{DEFAULT_CONTEXT_TURNS, DEFAULT_COOLDOWN};
use crate::coach::turns::MIN_TURN_CHARS;
use crate::coach::types::Language;
use crate::llm_engine::ReasoningBackend;
use crate::perception::protocol::GEMINI_LIVE_WS_URL;

pub const DEFAULT_PERCEPTION_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_GEMINI_REASONING_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OLLAMA_REASONING_MODEL: &str = "llama3.2";
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("No API key found. Set GEMINI_API_KEY (or API_KEY).")]
    MissingApiKey,
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct PerceptionConfig {
    pub ws_url: String,
    pub model: String,
    pub setup_timeout_secs: u64,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            ws_url: GEMINI_LIVE_WS_URL.to_string(),
            model: DEFAULT_PERCEPTION_MODEL.to_string(),
            setup_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub backend: ReasoningBackend,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self::for_backend(ReasoningBackend::Gemini)
    }
}

impl ReasoningConfig {
    pub fn for_backend(backend: ReasoningBackend) -> Self {
        let (model, base_url) = match backend {
            ReasoningBackend::Gemini => (DEFAULT_GEMINI_REASONING_MODEL, GEMINI_API_BASE_URL),
            ReasoningBackend::Ollama => (DEFAULT_OLLAMA_REASONING_MODEL, OLLAMA_BASE_URL),
        };
        Self {
            backend,
            model: model.to_string(),
            base_url: base_url.to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoachingConfig {
    pub cooldown: Duration,
    pub context_turns: usize,
    pub min_turn_chars: usize,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            context_turns: DEFAULT_CONTEXT_TURNS,
            min_turn_chars: MIN_TURN_CHARS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Samples per captured block
    pub block_size: usize,
    /// Sample rate expected by the perception endpoint
    pub target_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            block_size: 4096,
            target_sample_rate: 16000,
        }
    }
}

#[derive(Clone, Default)]
pub struct CoachConfig {
    pub api_key: String,
    pub language: Language,
    pub perception: PerceptionConfig,
    pub reasoning: ReasoningConfig,
    pub coaching: CoachingConfig,
    pub audio: AudioConfig,
}

impl fmt::Debug for CoachConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoachConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("language", &self.language)
            .field("perception", &self.perception)
            .field("reasoning", &self.reasoning)
            .field("coaching", &self.coaching)
            .field("audio", &self.audio)
            .finish()
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

impl CoachConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = CoachConfig::default();

        config.api_key = get("GEMINI_API_KEY")
            .or_else(|| get("API_KEY"))
            .ok_or(ConfigError::MissingApiKey)?;

        if let Some(value) = get("COACH_LANGUAGE") {
            config.language = value.parse().map_err(|_| invalid("COACH_LANGUAGE", &value))?;
        }

        if let Some(value) = get("COACH_REASONING_PROVIDER") {
            let backend: ReasoningBackend = value
                .parse()
                .map_err(|_| invalid("COACH_REASONING_PROVIDER", &value))?;
            config.reasoning = ReasoningConfig::for_backend(backend);
        }
        if let Some(model) = get("COACH_REASONING_MODEL") {
            config.reasoning.model = model;
        }
        if let Some(url) = get("COACH_REASONING_URL") {
            config.reasoning.base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(model) = get("COACH_PERCEPTION_MODEL") {
            config.perception.model = model;
        }

        if let Some(value) = get("COACH_COOLDOWN_SECS") {
            config.coaching.cooldown = value
                .parse::<f64>()
                .ok()
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| invalid("COACH_COOLDOWN_SECS", &value))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CoachConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.language, Language::En);
        assert_eq!(config.reasoning.backend, ReasoningBackend::Gemini);
        assert_eq!(config.coaching.cooldown, Duration::from_secs(5));
        assert_eq!(config.coaching.context_turns, 5);
        assert_eq!(config.audio.block_size, 4096);
        assert_eq!(config.audio.target_sample_rate, 16000);
        assert_eq!(config.perception.setup_timeout_secs, 15);
    }

    #[test]
    fn test_missing_api_key() {
        let err = CoachConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);

        let config = CoachConfig::from_lookup(lookup(&[("API_KEY", "fallback")])).unwrap();
        assert_eq!(config.api_key, "fallback");
    }

    #[test]
    fn test_overrides() {
        let config = CoachConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("COACH_LANGUAGE", "fr"),
            ("COACH_REASONING_PROVIDER", "ollama"),
            ("COACH_REASONING_URL", "http://gpu-box:11434/"),
            ("COACH_COOLDOWN_SECS", "2.5"),
        ]))
        .unwrap();

        assert_eq!(config.language, Language::Fr);
        assert_eq!(config.reasoning.backend, ReasoningBackend::Ollama);
        assert_eq!(config.reasoning.model, DEFAULT_OLLAMA_REASONING_MODEL);
        assert_eq!(config.reasoning.base_url, "http://gpu-box:11434");
        assert_eq!(config.coaching.cooldown, Duration::from_millis(2500));
    }

    #[test]
    fn test_invalid_values() {
        let err = CoachConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("COACH_LANGUAGE", "de")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "COACH_LANGUAGE"));

        assert!(CoachConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("COACH_COOLDOWN_SECS", "-1")])).is_err());
    }

    #[test]
    fn test_out_of_range_cooldown_is_rejected() {
        for value in ["1e300", "inf", "NaN"] {
            let err = CoachConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("COACH_COOLDOWN_SECS", value)]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "COACH_COOLDOWN_SECS"));
        }
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = CoachConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "secret-key")])).unwrap();
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
