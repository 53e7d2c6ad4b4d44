// Participant roster: folds speaker identity signals from both agents
// into one ordered list of people, with the coached user always first.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use super::types::{Language, Participant, ParticipantStatus, SignalCategory};
use crate::localization::user_synonyms;

/// Identity key of the coached user, stable for the whole session
pub const USER_PARTICIPANT_ID: &str = "user";

fn synonym_regex(language: Language) -> Regex {
    let alternation = user_synonyms(language)
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("Invalid user synonym pattern")
}

static SYNONYMS_EN: Lazy<Regex> = Lazy::new(|| synonym_regex(Language::En));
static SYNONYMS_FR: Lazy<Regex> = Lazy::new(|| synonym_regex(Language::Fr));
static SYNONYMS_ES: Lazy<Regex> = Lazy::new(|| synonym_regex(Language::Es));

static EMPTY_BRACKETS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\)|\[\s*\]").expect("Invalid bracket pattern"));

fn synonyms_for(language: Language) -> &'static Regex {
    match language {
        Language::En => &SYNONYMS_EN,
        Language::Fr => &SYNONYMS_FR,
        Language::Es => &SYNONYMS_ES,
    }
}

/// How an incoming speaker label relates to the coached user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelKind {
    /// A bare synonym such as "User" or "vous"; carries the trimmed label
    Generic(String),
    /// A real name tagged as the user, e.g. "Marie (you)"
    NamedUser(String),
    /// Any other speaker
    Other(String),
}

impl LabelKind {
    pub fn refers_to_user(&self) -> bool {
        !matches!(self, LabelKind::Other(_))
    }

    pub fn display_name(&self) -> &str {
        match self {
            LabelKind::Generic(name) | LabelKind::NamedUser(name) | LabelKind::Other(name) => name,
        }
    }
}

/// Trim, collapse whitespace and strip separators left around a name.
/// Brackets are kept; empty pairs are removed during classification.
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '-' | '–' | ':' | ',' | ';' | '"' | '\'' | '/')
    });
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn classify_label(label: &str, language: Language) -> LabelKind {
    let cleaned = normalize_name(label);
    let lowered = cleaned.to_lowercase();

    if user_synonyms(language).iter().any(|term| *term == lowered) {
        return LabelKind::Generic(cleaned);
    }

    let synonyms = synonyms_for(language);
    if !synonyms.is_match(&cleaned) {
        return LabelKind::Other(cleaned);
    }

    let without_synonyms = synonyms.replace_all(&cleaned, " ");
    let remainder = normalize_name(&EMPTY_BRACKETS.replace_all(&without_synonyms, " "));

    // "User 1" and similar leftovers are not names
    if remainder.chars().any(|c| c.is_alphabetic()) {
        LabelKind::NamedUser(remainder)
    } else {
        LabelKind::Generic(cleaned)
    }
}

fn new_participant_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("p-{}", &simple[..8])
}

/// Ordered, append-only roster for one session
#[derive(Debug)]
pub struct ParticipantRoster {
    participants: Vec<Participant>,
    language: Language,
}

impl ParticipantRoster {
    pub fn new(language: Language) -> Self {
        Self {
            participants: Vec::new(),
            language,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn user(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_user)
    }

    pub fn speaking(&self) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.status == ParticipantStatus::Speaking)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    /// Fold one identity signal into the roster.
    ///
    /// Returns the display name of the participant the signal landed on.
    pub fn observe(&mut self, label: &str, category: SignalCategory, observation: &str) -> String {
        let kind = classify_label(label, self.language);
        let note = category.records_note().then(|| observation.trim().to_string());

        if self.participants.is_empty() {
            let name = kind.display_name().to_string();
            info!("First voice identified as the coached user: '{}'", name);
            self.participants.push(Participant {
                id: USER_PARTICIPANT_ID.to_string(),
                name: name.clone(),
                is_user: true,
                status: ParticipantStatus::Speaking,
                last_note: note,
            });
            return name;
        }

        if kind.refers_to_user() {
            if let Some(index) = self.participants.iter().position(|p| p.is_user) {
                let user = &mut self.participants[index];
                // Generic labels never overwrite a name already learned
                if let LabelKind::NamedUser(name) = &kind {
                    if user.name != *name {
                        debug!("Coached user renamed '{}' -> '{}'", user.name, name);
                        user.name = name.clone();
                    }
                }
                if note.is_some() {
                    user.last_note = note;
                }
                let name = user.name.clone();
                self.mark_speaking(index);
                return name;
            }
        }

        let name = kind.display_name().to_string();
        let lowered = name.to_lowercase();
        if let Some(index) = self
            .participants
            .iter()
            .position(|p| p.name.to_lowercase() == lowered)
        {
            if note.is_some() {
                self.participants[index].last_note = note;
            }
            let name = self.participants[index].name.clone();
            self.mark_speaking(index);
            return name;
        }

        let id = new_participant_id();
        info!("New participant '{}' ({})", name, id);
        self.participants.push(Participant {
            id,
            name: name.clone(),
            is_user: false,
            status: ParticipantStatus::Idle,
            last_note: note,
        });
        self.mark_speaking(self.participants.len() - 1);
        name
    }

    /// Retrospective correction from the reasoning agent.
    ///
    /// Every detected name goes through `observe` with a neutral category,
    /// then nobody is left marked as speaking.
    pub fn reconcile_detected(&mut self, names: &[String]) {
        for name in names {
            if normalize_name(name).is_empty() {
                continue;
            }
            self.observe(name, SignalCategory::Context, "");
        }
        for participant in &mut self.participants {
            participant.status = ParticipantStatus::Idle;
        }
    }

    fn mark_speaking(&mut self, index: usize) {
        for (i, participant) in self.participants.iter_mut().enumerate() {
            participant.status = if i == index {
                ParticipantStatus::Speaking
            } else {
                ParticipantStatus::Idle
            };
        }
    }
}
