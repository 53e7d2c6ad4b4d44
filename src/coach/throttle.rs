// Rate limiter for reasoning requests
use std::time::{Duration, Instant};

use super::turns::{format_context, TurnBuffer};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);
pub const DEFAULT_CONTEXT_TURNS: usize = 5;

/// An accepted reasoning request
#[derive(Debug, Clone, PartialEq)]
pub struct CoachingRequest {
    pub context: String,
    pub turn_count: usize,
}

#[derive(Debug)]
pub struct CoachThrottle {
    cooldown: Duration,
    context_turns: usize,
    last_accepted: Option<Instant>,
    /// Accepted requests whose response has not come back yet
    in_flight: usize,
    /// Committed turn count when the last request was accepted
    turns_at_last_request: usize,
}

impl Default for CoachThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, DEFAULT_CONTEXT_TURNS)
    }
}

impl CoachThrottle {
    pub fn new(cooldown: Duration, context_turns: usize) -> Self {
        Self {
            cooldown,
            context_turns: context_turns.max(1),
            last_accepted: None,
            in_flight: 0,
            turns_at_last_request: 0,
        }
    }

    /// Accept a request if the cooldown has elapsed and there is history to send
    pub fn try_acquire(&mut self, now: Instant, turns: &TurnBuffer) -> Option<CoachingRequest> {
        if turns.is_empty() {
            return None;
        }
        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < self.cooldown {
                return None;
            }
        }

        self.last_accepted = Some(now);
        self.in_flight += 1;
        self.turns_at_last_request = turns.len();

        let recent = turns.recent(self.context_turns);
        Some(CoachingRequest {
            context: format_context(recent),
            turn_count: recent.len(),
        })
    }

    /// Turns were committed since the last accepted request
    pub fn has_pending_turns(&self, turns: &TurnBuffer) -> bool {
        turns.len() > self.turns_at_last_request
    }

    /// One response (or failure) came back
    pub fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight
    }

    /// Forget outstanding requests whose responses will be discarded
    pub fn abandon_in_flight(&mut self) {
        self.in_flight = 0;
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.in_flight = 0;
        self.turns_at_last_request = 0;
    }
}
