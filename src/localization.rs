//! Localized strings used by the coach core and the console front end

use crate::coach::types::{ConnectionStatus, Language};

/// Strings for one interface language
#[derive(Debug)]
pub struct Translations {
    /// Generic placeholder for the coached user
    pub you: &'static str,
    /// How the user is addressed in running text
    pub you_mention: &'static str,
    /// Words that, on their own, designate the coached user
    pub user_terms: &'static [&'static str],
    pub status_active: &'static str,
    pub status_offline: &'static str,
    pub status_connecting: &'static str,
    pub status_error: &'static str,
    pub last_heard: &'static str,
    pub participants: &'static str,
    pub interest_points: &'static str,
    pub thinking: &'static str,
    pub welcome_message: &'static str,
    pub ready_message: &'static str,
}

impl Translations {
    pub fn status_label(&self, status: ConnectionStatus) -> &'static str {
        match status {
            ConnectionStatus::Disconnected => self.status_offline,
            ConnectionStatus::Connecting => self.status_connecting,
            ConnectionStatus::Connected => self.status_active,
            ConnectionStatus::Error => self.status_error,
        }
    }
}

static EN: Translations = Translations {
    you: "User",
    you_mention: "you",
    user_terms: &["you", "user", "me", "myself", "coached"],
    status_active: "Live Coaching",
    status_offline: "Offline",
    status_connecting: "Connecting...",
    status_error: "Connection error",
    last_heard: "Last heard:",
    participants: "Interlocutors",
    interest_points: "Meeting Interests",
    thinking: "Analyzing...",
    welcome_message: "Hello! I'm here and ready to help you succeed. Please give me a quick briefing of what you want to achieve in this meeting.",
    ready_message: "OK, I've got the goals. I'm ready for the meeting. Let's do this together, you've got this!",
};

static FR: Translations = Translations {
    you: "Utilisateur",
    you_mention: "vous",
    user_terms: &["vous", "utilisateur", "utilisatrice", "moi", "coaché", "coachée"],
    status_active: "Coaching en Direct",
    status_offline: "Hors-ligne",
    status_connecting: "Connexion...",
    status_error: "Erreur de connexion",
    last_heard: "Dernier entendu :",
    participants: "Interlocuteurs",
    interest_points: "Points d'intérêts",
    thinking: "Analyse en cours...",
    welcome_message: "Bonjour ! Je suis là et prêt à vous aider à réussir. Faites-moi un petit briefing de ce que vous voulez accomplir aujourd'hui.",
    ready_message: "C'est noté, j'ai bien compris les objectifs. Je suis prêt pour la réunion. On y va ensemble, vous allez assurer !",
};

static ES: Translations = Translations {
    you: "Usuario",
    you_mention: "tú",
    user_terms: &["tú", "usted", "usuario", "usuaria", "yo", "entrenado", "entrenada"],
    status_active: "Coaching en Vivo",
    status_offline: "Fuera de línea",
    status_connecting: "Conectando...",
    status_error: "Error de conexión",
    last_heard: "Último escuchado:",
    participants: "Interlocutores",
    interest_points: "Puntos de Interés",
    thinking: "Analizando...",
    welcome_message: "¡Hola! Estoy aquí y listo para ayudarte a triunfar. Por favor, dame un breve resumen de lo que quieres lograr en esta reunión.",
    ready_message: "Entendido, ya tengo los objetivos. Estoy listo para la reunión. ¡Vamos juntos, tú puedes!",
};

pub fn translations(language: Language) -> &'static Translations {
    match language {
        Language::En => &EN,
        Language::Fr => &FR,
        Language::Es => &ES,
    }
}

/// User synonyms accepted for a language.
///
/// The perception agent falls back to English labels regardless of the
/// configured language, so the English set is always included.
pub fn user_synonyms(language: Language) -> Vec<&'static str> {
    let mut terms: Vec<&'static str> = EN.user_terms.to_vec();
    if language != Language::En {
        terms.extend_from_slice(translations(language).user_terms);
    }
    terms
}
