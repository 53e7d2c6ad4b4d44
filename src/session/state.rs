// Per-session meeting data, reset on every start
use std::time::Instant;

use crate::coach::advice::AdviceLog;
use crate::coach::participants::ParticipantRoster;
use crate::coach::turns::TurnBuffer;
use crate::coach::types::{InterestPoint, Language};

#[derive(Debug)]
pub struct MeetingState {
    pub turns: TurnBuffer,
    pub roster: ParticipantRoster,
    pub advice: AdviceLog,
    /// Replaced wholesale on each update from the perception agent
    pub interest_points: Vec<InterestPoint>,
}

impl MeetingState {
    pub fn new(language: Language, min_turn_chars: usize, now: Instant) -> Self {
        Self {
            turns: TurnBuffer::new(min_turn_chars),
            roster: ParticipantRoster::new(language),
            advice: AdviceLog::new(now),
            interest_points: Vec::new(),
        }
    }

    pub fn reset(&mut self, language: Language, now: Instant) {
        self.turns.clear();
        self.roster.clear();
        self.roster.set_language(language);
        self.advice.reset(now);
        self.interest_points.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coach::types::{InterestKind, SignalCategory};

    #[test]
    fn test_reset_clears_everything() {
        let now = Instant::now();
        let mut state = MeetingState::new(Language::En, 5, now);
        state.turns.push_fragment("a long enough turn");
        state.turns.complete_turn(1);
        state.roster.observe("User", SignalCategory::Context, "");
        state.advice.push_system_message("hello", now);
        state.interest_points.push(InterestPoint {
            id: "1".to_string(),
            text: "budget".to_string(),
            kind: InterestKind::Goal,
        });

        state.reset(Language::Fr, now);

        assert!(state.turns.is_empty());
        assert!(state.roster.is_empty());
        assert!(state.advice.is_empty());
        assert!(state.interest_points.is_empty());
    }
}
