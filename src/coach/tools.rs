//! Tool boundary for the perception agent
//!
//! Declares the functions the live model may call, validates incoming
//! call arguments into typed values and builds the acknowledgement payloads.
//! Arguments that fail validation never reach the session state.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use super::participants::normalize_name;
use super::types::{InterestKind, InterestPoint, SignalCategory};

pub const IDENTIFY_SPEAKER_TOOL: &str = "identify_speaker_activity";
pub const INTEREST_POINTS_TOOL: &str = "update_meeting_interest_points";
/// Older name for the speaker tool, always sent with a suggestion
pub const COACH_ADVICE_TOOL: &str = "provide_coach_advice";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

impl ToolError {
    pub fn acknowledgement(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

// ============================================================================
// Typed arguments
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeakerActivity {
    pub speaker: String,
    pub category: SignalCategory,
    #[serde(default)]
    pub observation: String,
    /// Live advice attached to the signal, appended to the advice log
    #[serde(default)]
    pub suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointArg {
    Text(String),
    Detailed {
        text: String,
        #[serde(rename = "type", default)]
        kind: InterestKind,
    },
}

#[derive(Debug, Deserialize)]
struct InterestPointsArgs {
    points: Vec<PointArg>,
}

/// A validated tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    SpeakerActivity(SpeakerActivity),
    InterestPoints(Vec<InterestPoint>),
}

impl ToolInvocation {
    pub fn acknowledgement(&self) -> Value {
        match self {
            ToolInvocation::SpeakerActivity(_) => json!({ "acknowledged": true }),
            ToolInvocation::InterestPoints(_) => json!({ "updated": true }),
        }
    }
}

fn invalid(tool: &str, reason: impl ToString) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate a tool call from the perception agent
pub fn parse_tool_call(name: &str, args: &Value) -> Result<ToolInvocation, ToolError> {
    match name {
        IDENTIFY_SPEAKER_TOOL | COACH_ADVICE_TOOL => {
            let mut activity: SpeakerActivity =
                serde_json::from_value(args.clone()).map_err(|e| invalid(name, e))?;
            if normalize_name(&activity.speaker).is_empty() {
                return Err(invalid(name, "speaker has no name"));
            }
            activity.suggestion = activity
                .suggestion
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Ok(ToolInvocation::SpeakerActivity(activity))
        }
        INTEREST_POINTS_TOOL => {
            let parsed: InterestPointsArgs =
                serde_json::from_value(args.clone()).map_err(|e| invalid(name, e))?;
            let points = parsed
                .points
                .into_iter()
                .filter_map(|point| {
                    let (text, kind) = match point {
                        PointArg::Text(text) => (text, InterestKind::Goal),
                        PointArg::Detailed { text, kind } => (text, kind),
                    };
                    let text = text.trim().to_string();
                    (!text.is_empty()).then(|| InterestPoint {
                        id: Uuid::new_v4().to_string(),
                        text,
                        kind,
                    })
                })
                .collect();
            Ok(ToolInvocation::InterestPoints(points))
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

// ============================================================================
// Declarations sent in the live setup message
// ============================================================================

pub fn tool_declarations() -> Value {
    json!([
        {
            "name": IDENTIFY_SPEAKER_TOOL,
            "description": "Report who is speaking right now. Call it as soon as the voice changes.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "speaker": {
                        "type": "STRING",
                        "description": "Speaker label: the user label, a known name, or 'Interlocutor N'."
                    },
                    "category": {
                        "type": "STRING",
                        "enum": ["negotiation", "tone", "argument", "emotion", "context"]
                    },
                    "observation": {
                        "type": "STRING",
                        "description": "Short note on the speaker's tone or emotional state."
                    },
                    "suggestion": {
                        "type": "STRING",
                        "description": "Optional short advice or encouragement for the user."
                    }
                },
                "required": ["speaker", "category"]
            }
        },
        {
            "name": INTEREST_POINTS_TOOL,
            "description": "Replace the list of goals, figures and constraints for this meeting.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "points": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "text": { "type": "STRING" },
                                "type": {
                                    "type": "STRING",
                                    "enum": ["goal", "context", "tactic"]
                                }
                            },
                            "required": ["text"]
                        }
                    }
                },
                "required": ["points"]
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speaker_activity() {
        let args = json!({ "speaker": "Interlocutor 1", "category": "emotion", "observation": "nervous" });
        let invocation = parse_tool_call(IDENTIFY_SPEAKER_TOOL, &args).unwrap();

        match &invocation {
            ToolInvocation::SpeakerActivity(activity) => {
                assert_eq!(activity.speaker, "Interlocutor 1");
                assert_eq!(activity.category, SignalCategory::Emotion);
                assert_eq!(activity.observation, "nervous");
            }
            other => panic!("unexpected invocation: {:?}", other),
        }
        assert_eq!(invocation.acknowledgement(), json!({ "acknowledged": true }));
    }

    #[test]
    fn test_unknown_category_becomes_context() {
        let args = json!({ "speaker": "John", "category": "humor" });
        let invocation = parse_tool_call(IDENTIFY_SPEAKER_TOOL, &args).unwrap();
        assert_eq!(
            invocation,
            ToolInvocation::SpeakerActivity(SpeakerActivity {
                speaker: "John".to_string(),
                category: SignalCategory::Context,
                observation: String::new(),
                suggestion: None,
            })
        );
    }

    #[test]
    fn test_malformed_speaker_args_fail_closed() {
        assert!(parse_tool_call(IDENTIFY_SPEAKER_TOOL, &json!({ "category": "tone" })).is_err());
        assert!(parse_tool_call(IDENTIFY_SPEAKER_TOOL, &json!({ "speaker": 3, "category": "tone" })).is_err());
        assert!(parse_tool_call(IDENTIFY_SPEAKER_TOOL, &json!({ "speaker": "  ", "category": "tone" })).is_err());
        // punctuation only normalizes to nothing
        assert!(parse_tool_call(IDENTIFY_SPEAKER_TOOL, &json!({ "speaker": "--", "category": "tone" })).is_err());
        assert!(parse_tool_call(IDENTIFY_SPEAKER_TOOL, &json!({ "speaker": " : / ", "category": "tone" })).is_err());

        let err = parse_tool_call(IDENTIFY_SPEAKER_TOOL, &json!("nope")).unwrap_err();
        assert!(err.acknowledgement()["error"].as_str().unwrap().contains(IDENTIFY_SPEAKER_TOOL));
    }

    #[test]
    fn test_advice_tool_carries_suggestion() {
        let args = json!({
            "speaker": "Marie",
            "category": "negotiation",
            "observation": "pushing on price",
            "suggestion": "  Hold your number  "
        });
        let ToolInvocation::SpeakerActivity(activity) = parse_tool_call(COACH_ADVICE_TOOL, &args).unwrap() else {
            panic!("expected speaker activity");
        };
        assert_eq!(activity.suggestion.as_deref(), Some("Hold your number"));

        let args = json!({ "speaker": "Marie", "category": "tone", "suggestion": " " });
        let ToolInvocation::SpeakerActivity(activity) = parse_tool_call(IDENTIFY_SPEAKER_TOOL, &args).unwrap() else {
            panic!("expected speaker activity");
        };
        assert_eq!(activity.suggestion, None);
    }

    #[test]
    fn test_parse_mixed_interest_points() {
        let args = json!({
            "points": [
                "Budget under 50k",
                { "text": "Delivery in March", "type": "context" },
                { "text": "Anchor high" , "type": "tactic" },
                { "text": "Keep the team", "type": "wish" },
                "   "
            ]
        });

        let invocation = parse_tool_call(INTEREST_POINTS_TOOL, &args).unwrap();
        assert_eq!(invocation.acknowledgement(), json!({ "updated": true }));
        let ToolInvocation::InterestPoints(points) = invocation else {
            panic!("expected interest points");
        };

        let summary: Vec<_> = points.iter().map(|p| (p.text.as_str(), p.kind)).collect();
        assert_eq!(
            summary,
            vec![
                ("Budget under 50k", InterestKind::Goal),
                ("Delivery in March", InterestKind::Context),
                ("Anchor high", InterestKind::Tactic),
                ("Keep the team", InterestKind::Goal),
            ]
        );
    }

    #[test]
    fn test_interest_points_require_list() {
        assert!(parse_tool_call(INTEREST_POINTS_TOOL, &json!({ "points": "budget" })).is_err());
        assert!(parse_tool_call(INTEREST_POINTS_TOOL, &json!({})).is_err());
    }

    #[test]
    fn test_unknown_tool() {
        let err = parse_tool_call("play_music", &json!({})).unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("play_music".to_string()));
        assert_eq!(err.acknowledgement(), json!({ "error": "Unknown tool: play_music" }));
    }

    #[test]
    fn test_declarations_cover_both_tools() {
        let declarations = tool_declarations();
        let names: Vec<_> = declarations
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec![IDENTIFY_SPEAKER_TOOL, INTEREST_POINTS_TOOL]);
    }
}
