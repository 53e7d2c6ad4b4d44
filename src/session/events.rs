// Events published by the session task to front ends
use serde::Serialize;

use crate::coach::types::{
    Advice, ConnectionStatus, ConversationTurn, InterestPoint, Participant, SessionPhase,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoachEvent {
    StatusChanged { status: ConnectionStatus },
    PhaseChanged { phase: SessionPhase },
    /// Latest transcript fragment, for the "last heard" line
    Transcript { fragment: String },
    TurnCommitted { turn: ConversationTurn },
    AdviceAdded { advice: Advice },
    ParticipantsUpdated { participants: Vec<Participant> },
    InterestPointsUpdated { points: Vec<InterestPoint> },
    /// A reasoning request is in flight
    Thinking { active: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let value = serde_json::to_value(CoachEvent::StatusChanged {
            status: ConnectionStatus::Connecting,
        })
        .unwrap();
        assert_eq!(value["type"], "status_changed");
        assert_eq!(value["status"], "CONNECTING");
    }
}
