//! Gemini Live wire format
//!
//! Client messages: a `setup` frame, `realtimeInput` audio chunks and
//! `toolResponse` acknowledgements. Server messages are parsed into
//! [`PerceptionEvent`]s; model audio is ignored since the coach stays silent.

use base64::Engine;
use log::warn;
use serde::Serialize;
use serde_json::{json, Value};

/// Gemini Live websocket endpoint
pub const GEMINI_LIVE_WS_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Input audio format: 16 kHz PCM16 little-endian mono
pub const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

// ── Setup ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SetupMessage {
    pub setup: SetupPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupPayload {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: SystemInstruction,
    pub tools: Vec<ToolBlock>,
    /// Empty object turns on transcription of the input audio
    pub input_audio_transcription: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolBlock {
    pub function_declarations: Value,
}

/// Build the first frame of a perception session
pub fn build_setup_message(model: &str, system_instruction: String, declarations: Value) -> SetupMessage {
    let model = if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    };

    SetupMessage {
        setup: SetupPayload {
            model,
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
            },
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: system_instruction,
                }],
            },
            tools: vec![ToolBlock {
                function_declarations: declarations,
            }],
            input_audio_transcription: json!({}),
        },
    }
}

// ── Client messages ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RealtimeInputMessage {
    #[serde(rename = "realtimeInput")]
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
pub struct RealtimeInput {
    #[serde(rename = "mediaChunks")]
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize)]
pub struct MediaChunk {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

/// Wrap PCM bytes as `{"realtimeInput": {"mediaChunks": [...]}}`
pub fn build_audio_message(pcm_data: &[u8]) -> RealtimeInputMessage {
    RealtimeInputMessage {
        realtime_input: RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: INPUT_AUDIO_MIME.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(pcm_data),
            }],
        },
    }
}

/// Acknowledgement for one tool call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: Value,
}

pub fn build_tool_response_message(responses: &[FunctionResponse]) -> Value {
    json!({
        "toolResponse": {
            "functionResponses": responses,
        }
    })
}

/// Messages queued for the websocket writer
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Audio(Vec<u8>),
    ToolResponse(FunctionResponse),
    Close,
}

// ── Server messages ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PerceptionEvent {
    SetupComplete,
    /// Incremental transcript of the input audio
    InputTranscript { text: String },
    TurnComplete,
    ToolCall { id: String, name: String, args: Value },
    /// Server will close the connection soon
    GoAway { time_left: Option<String> },
    Closed { reason: Option<String> },
    Error { message: String },
}

fn transcript_text(container: &Value) -> Option<&str> {
    container
        .get("inputTranscription")
        .and_then(|t| t.get("text"))
        .and_then(|v| v.as_str())
        .filter(|text| !text.is_empty())
}

/// Parse one server frame.
///
/// A frame can carry several events; transcript text is emitted before the
/// turn-complete flag of the same frame so it lands in the closing turn.
pub fn parse_server_message(json_text: &str) -> Vec<PerceptionEvent> {
    let mut events = Vec::new();

    let value: Value = match serde_json::from_str(json_text) {
        Ok(v) => v,
        Err(e) => {
            // One garbled frame is not worth the session
            warn!("Skipping unparseable server frame: {}", e);
            return events;
        }
    };

    if value.get("setupComplete").is_some() {
        events.push(PerceptionEvent::SetupComplete);
    }

    if let Some(content) = value.get("serverContent") {
        if let Some(text) = transcript_text(content) {
            events.push(PerceptionEvent::InputTranscript {
                text: text.to_string(),
            });
        }
        if content.get("turnComplete").and_then(|v| v.as_bool()) == Some(true) {
            events.push(PerceptionEvent::TurnComplete);
        }
    }

    // Older servers put the transcription at the top level
    if let Some(text) = transcript_text(&value) {
        events.push(PerceptionEvent::InputTranscript {
            text: text.to_string(),
        });
    }

    if let Some(calls) = value.pointer("/toolCall/functionCalls").and_then(|v| v.as_array()) {
        for call in calls {
            let name = call.get("name").and_then(|v| v.as_str()).unwrap_or_default();
            events.push(PerceptionEvent::ToolCall {
                id: call.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                name: name.to_string(),
                args: call.get("args").cloned().unwrap_or_else(|| json!({})),
            });
        }
    }

    if let Some(go_away) = value.get("goAway") {
        events.push(PerceptionEvent::GoAway {
            time_left: go_away.get("timeLeft").and_then(|v| v.as_str()).map(String::from),
        });
    }

    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown server error");
        events.push(PerceptionEvent::Error {
            message: message.to_string(),
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_message_shape() {
        let setup = build_setup_message("gemini-live-test", "be quiet".to_string(), json!([{ "name": "t" }]));
        let value = serde_json::to_value(&setup).unwrap();

        assert_eq!(value["setup"]["model"], "models/gemini-live-test");
        assert_eq!(value["setup"]["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(value["setup"]["systemInstruction"]["parts"][0]["text"], "be quiet");
        assert_eq!(value["setup"]["tools"][0]["functionDeclarations"][0]["name"], "t");
        assert_eq!(value["setup"]["inputAudioTranscription"], json!({}));
    }

    #[test]
    fn test_audio_message_is_base64() {
        let msg = build_audio_message(&[0x01, 0x00, 0xff, 0x7f]);
        let value = serde_json::to_value(&msg).unwrap();
        let chunk = &value["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], INPUT_AUDIO_MIME);
        assert_eq!(chunk["data"], "AQD/fw==");
    }

    #[test]
    fn test_tool_response_message() {
        let value = build_tool_response_message(&[FunctionResponse {
            id: "call-1".to_string(),
            name: "identify_speaker_activity".to_string(),
            response: json!({ "acknowledged": true }),
        }]);
        let response = &value["toolResponse"]["functionResponses"][0];
        assert_eq!(response["id"], "call-1");
        assert_eq!(response["response"]["acknowledged"], true);
    }

    #[test]
    fn test_parse_transcript_before_turn_complete() {
        let events = parse_server_message(
            r#"{"serverContent":{"inputTranscription":{"text":" right."},"turnComplete":true}}"#,
        );
        assert_eq!(
            events,
            vec![
                PerceptionEvent::InputTranscript { text: " right.".to_string() },
                PerceptionEvent::TurnComplete,
            ]
        );
    }

    #[test]
    fn test_parse_tool_calls() {
        let events = parse_server_message(
            r#"{"toolCall":{"functionCalls":[
                {"id":"a","name":"identify_speaker_activity","args":{"speaker":"John","category":"tone"}},
                {"id":"b","name":"update_meeting_interest_points"}
            ]}}"#,
        );
        assert_eq!(events.len(), 2);
        match &events[0] {
            PerceptionEvent::ToolCall { id, name, args } => {
                assert_eq!(id, "a");
                assert_eq!(name, "identify_speaker_activity");
                assert_eq!(args["speaker"], "John");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match &events[1] {
            PerceptionEvent::ToolCall { args, .. } => assert_eq!(args, &json!({})),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_control_messages() {
        assert_eq!(parse_server_message(r#"{"setupComplete":{}}"#), vec![PerceptionEvent::SetupComplete]);
        assert_eq!(
            parse_server_message(r#"{"goAway":{"timeLeft":"10s"}}"#),
            vec![PerceptionEvent::GoAway { time_left: Some("10s".to_string()) }]
        );
        assert_eq!(
            parse_server_message(r#"{"error":{"message":"quota"}}"#),
            vec![PerceptionEvent::Error { message: "quota".to_string() }]
        );
    }

    #[test]
    fn test_garbled_frame_is_skipped() {
        assert!(parse_server_message("not json").is_empty());
        assert!(parse_server_message(r#"{"serverContent": {"inputTranscription": "#).is_empty());
    }

    #[test]
    fn test_model_audio_is_ignored() {
        let events = parse_server_message(
            r#"{"serverContent":{"modelTurn":{"parts":[{"inlineData":{"mimeType":"audio/pcm","data":"AAAA"}}]}}}"#,
        );
        assert!(events.is_empty());
    }
}
