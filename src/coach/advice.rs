// Append-only advice log with session-relative timestamps
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::types::{Advice, AdviceCategory, COACH_SPEAKER, SYSTEM_SPEAKER};

/// Format elapsed session time as MM:SS (minutes keep growing past 59)
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[derive(Debug)]
pub struct AdviceLog {
    entries: Vec<Advice>,
    started_at: Instant,
}

impl AdviceLog {
    pub fn new(started_at: Instant) -> Self {
        Self {
            entries: Vec::new(),
            started_at,
        }
    }

    pub fn reset(&mut self, started_at: Instant) {
        self.entries.clear();
        self.started_at = started_at;
    }

    pub fn push(
        &mut self,
        category: AdviceCategory,
        observation: impl Into<String>,
        suggestion: impl Into<String>,
        speaker: impl Into<String>,
        now: Instant,
    ) -> &Advice {
        let advice = Advice {
            id: Uuid::new_v4().to_string(),
            timestamp: format_elapsed(now.saturating_duration_since(self.started_at)),
            category,
            observation: observation.into(),
            suggestion: suggestion.into(),
            speaker: speaker.into(),
        };
        self.entries.push(advice);
        &self.entries[self.entries.len() - 1]
    }

    /// Lifecycle message spoken by the coach (welcome, ready)
    pub fn push_system_message(&mut self, text: &str, now: Instant) -> &Advice {
        self.push(AdviceCategory::Negotiation, SYSTEM_SPEAKER, text, COACH_SPEAKER, now)
    }

    pub fn entries(&self) -> &[Advice] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
