// Coaching session: lifecycle state machine, event dispatch and the owning task

pub mod controller;
pub mod events;
pub mod handle;
pub mod state;

#[cfg(test)]
mod testing;

pub use controller::{CoachSession, ReasoningOutcome, SessionError, SessionStreams};
pub use events::CoachEvent;
pub use handle::{run_session, spawn_session, SessionCommand, SessionHandle};
pub use state::MeetingState;
