// Coaching core: turn buffering, throttling, participant reconciliation,
// advice log and the perception tool boundary. Pure state, no I/O.

pub mod advice;
pub mod participants;
pub mod throttle;
pub mod tools;
pub mod turns;
pub mod types;

pub use advice::{format_elapsed, AdviceLog};
pub use participants::{classify_label, LabelKind, ParticipantRoster, USER_PARTICIPANT_ID};
pub use throttle::{CoachThrottle, CoachingRequest};
pub use tools::{parse_tool_call, tool_declarations, ToolError, ToolInvocation};
pub use turns::{format_context, TurnBuffer};
pub use types::*;
