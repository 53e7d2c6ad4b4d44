// Shared data model for a coaching session
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speaker label used until an identity signal attributes a turn
pub const UNKNOWN_SPEAKER: &str = "Unknown";

/// Speaker label attached to advice produced by the reasoning agent
pub const COACH_SPEAKER: &str = "Coach";

/// Speaker label attached to lifecycle messages
pub const SYSTEM_SPEAKER: &str = "System";

/// Interface language. Drives prompts, UI strings and user synonyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Es,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Fr, Language::Es];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Es => "es",
        }
    }

    /// Language name as written in prompts
    pub fn english_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "French",
            Language::Es => "Spanish",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "fr" | "french" | "français" | "francais" => Ok(Language::Fr),
            "es" | "spanish" | "español" | "espanol" => Ok(Language::Es),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

/// A committed utterance. Only the speaker of the most recent turn may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: String,
    pub text: String,
    /// Wall-clock commit time in milliseconds since the epoch
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Speaking,
    Idle,
}

/// A meeting participant known to the roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub is_user: bool,
    pub status: ParticipantStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_note: Option<String>,
}

/// Category of a coaching card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceCategory {
    Negotiation,
    Tone,
    Argument,
    Emotion,
}

impl fmt::Display for AdviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdviceCategory::Negotiation => "negotiation",
            AdviceCategory::Tone => "tone",
            AdviceCategory::Argument => "argument",
            AdviceCategory::Emotion => "emotion",
        };
        f.write_str(name)
    }
}

/// Category carried by a speaker identity signal.
///
/// Anything the perception agent sends outside the known set lands in `Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalCategory {
    Negotiation,
    Tone,
    Argument,
    Emotion,
    #[serde(other)]
    Context,
}

impl SignalCategory {
    /// Tone and emotion observations are kept as the participant's note
    pub fn records_note(&self) -> bool {
        matches!(self, SignalCategory::Tone | SignalCategory::Emotion)
    }

    /// Advice category for a suggestion carried by this signal
    pub fn advice_category(&self) -> AdviceCategory {
        match self {
            SignalCategory::Tone => AdviceCategory::Tone,
            SignalCategory::Argument => AdviceCategory::Argument,
            SignalCategory::Emotion => AdviceCategory::Emotion,
            SignalCategory::Negotiation | SignalCategory::Context => AdviceCategory::Negotiation,
        }
    }
}

/// One coaching card in the append-only advice log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub id: String,
    /// Elapsed session time, MM:SS
    pub timestamp: String,
    pub category: AdviceCategory,
    pub observation: String,
    pub suggestion: String,
    pub speaker: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestKind {
    Context,
    Tactic,
    /// Unknown types fall back here
    #[default]
    #[serde(other)]
    Goal,
}

/// A negotiation objective captured during the briefing phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestPoint {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: InterestKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// A session may only be started from a resting state
    pub fn can_start(&self) -> bool {
        matches!(self, ConnectionStatus::Disconnected | ConnectionStatus::Error)
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Connected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Briefing,
    Meeting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parsing() {
        assert_eq!("fr".parse::<Language>().unwrap(), Language::Fr);
        assert_eq!(" Spanish ".parse::<Language>().unwrap(), Language::Es);
        assert!("de".parse::<Language>().is_err());
    }

    #[test]
    fn test_unknown_signal_category_maps_to_context() {
        let category: SignalCategory = serde_json::from_str("\"small-talk\"").unwrap();
        assert_eq!(category, SignalCategory::Context);

        let category: SignalCategory = serde_json::from_str("\"tone\"").unwrap();
        assert_eq!(category, SignalCategory::Tone);
        assert!(category.records_note());
        assert!(!SignalCategory::Argument.records_note());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&ConnectionStatus::Connected).unwrap();
        assert_eq!(json, "\"CONNECTED\"");
        assert!(ConnectionStatus::Error.can_start());
        assert!(!ConnectionStatus::Connecting.can_start());
    }

    #[test]
    fn test_interest_point_uses_type_field() {
        let point = InterestPoint {
            id: "ip-1".to_string(),
            text: "Close by Friday".to_string(),
            kind: InterestKind::Tactic,
        };
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["type"], "tactic");
    }

    #[test]
    fn test_unknown_interest_kind_maps_to_goal() {
        let point: InterestPoint =
            serde_json::from_str(r#"{"id":"ip-2","text":"Keep the warranty","type":"wish"}"#).unwrap();
        assert_eq!(point.kind, InterestKind::Goal);

        let kind: InterestKind = serde_json::from_str("\"context\"").unwrap();
        assert_eq!(kind, InterestKind::Context);
    }
}
