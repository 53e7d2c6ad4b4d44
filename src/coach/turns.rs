// Turn buffer: folds streamed transcript fragments into committed turns
use log::debug;

use super::types::{ConversationTurn, UNKNOWN_SPEAKER};

/// Fragments at or below this many characters (trimmed) are treated as noise
pub const MIN_TURN_CHARS: usize = 5;

#[derive(Debug)]
pub struct TurnBuffer {
    pending: String,
    /// Speaker reported while the pending turn was still accumulating
    pending_speaker: Option<String>,
    last_fragment: String,
    turns: Vec<ConversationTurn>,
    min_chars: usize,
}

impl Default for TurnBuffer {
    fn default() -> Self {
        Self::new(MIN_TURN_CHARS)
    }
}

impl TurnBuffer {
    pub fn new(min_chars: usize) -> Self {
        Self {
            pending: String::new(),
            pending_speaker: None,
            last_fragment: String::new(),
            turns: Vec::new(),
            min_chars,
        }
    }

    /// Append an incremental transcript fragment, in arrival order
    pub fn push_fragment(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.pending.push_str(text);
        self.last_fragment = text.to_string();
    }

    /// Close the pending turn.
    ///
    /// Returns the committed turn when the trimmed text is longer than the
    /// minimum; shorter text is dropped. The pending buffer is cleared either way.
    pub fn complete_turn(&mut self, timestamp_ms: i64) -> Option<&ConversationTurn> {
        let text = self.pending.trim().to_string();
        let speaker = self.pending_speaker.take();
        self.pending.clear();

        if text.chars().count() <= self.min_chars {
            if !text.is_empty() {
                debug!("Dropping short fragment ({} chars)", text.chars().count());
            }
            return None;
        }

        self.turns.push(ConversationTurn {
            speaker: speaker.unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
            text,
            timestamp: timestamp_ms,
        });
        self.turns.last()
    }

    /// Attribute a speaker label to the turn it most likely belongs to.
    ///
    /// A turn still accumulating takes the label when it commits. Otherwise the
    /// latest committed turn is patched, but only while its speaker is unknown.
    /// Returns true when a turn (pending or committed) took the label.
    pub fn attribute_speaker(&mut self, label: &str) -> bool {
        if !self.pending.trim().is_empty() {
            self.pending_speaker = Some(label.to_string());
            return true;
        }

        match self.turns.last_mut() {
            Some(last) if last.speaker == UNKNOWN_SPEAKER => {
                last.speaker = label.to_string();
                true
            }
            _ => false,
        }
    }

    /// The `n` most recent turns, oldest first
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_fragment(&self) -> &str {
        &self.last_fragment
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.pending_speaker = None;
        self.last_fragment.clear();
        self.turns.clear();
    }
}

/// Render turns as the reasoning context block, one `speaker: text` line each
pub fn format_context(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker, turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_requires_more_than_five_chars() {
        let mut buffer = TurnBuffer::default();

        buffer.push_fragment("  hello ");
        assert!(buffer.complete_turn(1).is_none());
        assert!(buffer.is_empty());

        buffer.push_fragment("hello");
        buffer.push_fragment("!");
        let turn = buffer.complete_turn(2).unwrap();
        assert_eq!(turn.text, "hello!");
        assert_eq!(turn.speaker, UNKNOWN_SPEAKER);
        assert_eq!(turn.timestamp, 2);
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut buffer = TurnBuffer::default();
        // five two-byte characters
        buffer.push_fragment("ééééé");
        assert!(buffer.complete_turn(1).is_none());

        buffer.push_fragment("éééééé");
        assert!(buffer.complete_turn(2).is_some());
    }

    #[test]
    fn test_buffer_cleared_after_discard() {
        let mut buffer = TurnBuffer::default();
        buffer.push_fragment("uh");
        assert!(buffer.complete_turn(1).is_none());

        buffer.push_fragment("Let's talk price");
        let turn = buffer.complete_turn(2).unwrap();
        assert_eq!(turn.text, "Let's talk price");
    }

    #[test]
    fn test_attribute_pending_turn() {
        let mut buffer = TurnBuffer::default();
        buffer.push_fragment("We need a discount");
        assert!(buffer.attribute_speaker("John"));

        let turn = buffer.complete_turn(5).unwrap();
        assert_eq!(turn.speaker, "John");

        // Next turn starts unattributed again
        buffer.push_fragment("Absolutely not");
        assert_eq!(buffer.complete_turn(6).unwrap().speaker, UNKNOWN_SPEAKER);
    }

    #[test]
    fn test_attribute_patches_only_unknown_last_turn() {
        let mut buffer = TurnBuffer::default();
        buffer.push_fragment("Opening statement");
        buffer.complete_turn(1);

        assert!(buffer.attribute_speaker("Marie"));
        assert_eq!(buffer.turns()[0].speaker, "Marie");

        assert!(!buffer.attribute_speaker("John"));
        assert_eq!(buffer.turns()[0].speaker, "Marie");
    }

    #[test]
    fn test_attribute_with_no_turns() {
        let mut buffer = TurnBuffer::default();
        assert!(!buffer.attribute_speaker("John"));
    }

    #[test]
    fn test_recent_and_context() {
        let mut buffer = TurnBuffer::default();
        for i in 0..7 {
            buffer.push_fragment(&format!("statement {}", i));
            buffer.complete_turn(i);
        }

        let recent = buffer.recent(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].text, "statement 2");

        let context = format_context(buffer.recent(2));
        assert_eq!(context, "Unknown: statement 5\nUnknown: statement 6");
        assert_eq!(buffer.recent(100).len(), 7);
    }

    #[test]
    fn test_last_fragment_and_clear() {
        let mut buffer = TurnBuffer::default();
        buffer.push_fragment("first part ");
        buffer.push_fragment("second part");
        assert_eq!(buffer.last_fragment(), "second part");
        buffer.complete_turn(1);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.last_fragment(), "");
    }
}
