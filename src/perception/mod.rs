// Perception agent: live transcription and speaker/tool events over Gemini Live

pub mod live;
pub mod protocol;

pub use live::{
    GeminiLiveConnector, PerceptionConnector, PerceptionError, PerceptionLink, PerceptionSender,
};
pub use protocol::{build_setup_message, FunctionResponse, OutboundMessage, PerceptionEvent, SetupMessage};
