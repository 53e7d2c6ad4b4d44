//! Line-oriented console front end
//!
//! Reads `start`, `stop`, `meeting`, `lang <code>` and `quit` from stdin and
//! prints session events as they are published.

use anyhow::Result;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};

use crate::audio::MicrophoneSource;
use crate::coach::types::{InterestKind, InterestPoint, Language, Participant, ParticipantStatus, SessionPhase};
use crate::config::CoachConfig;
use crate::llm_engine::create_provider;
use crate::localization::{translations, Translations};
use crate::perception::GeminiLiveConnector;
use crate::session::{spawn_session, CoachEvent, CoachSession, SessionError, SessionHandle};

/// Parsed console input
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Meeting,
    Language(Language),
    Quit,
    Help,
}

pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let mut words = line.split_whitespace();
    let command = match words.next()?.to_lowercase().as_str() {
        "start" => ConsoleCommand::Start,
        "stop" => ConsoleCommand::Stop,
        "meeting" | "ready" => ConsoleCommand::Meeting,
        "lang" | "language" => ConsoleCommand::Language(words.next()?.parse().ok()?),
        "quit" | "exit" => ConsoleCommand::Quit,
        "help" | "?" => ConsoleCommand::Help,
        _ => return None,
    };
    Some(command)
}

fn format_participants(t: &Translations, participants: &[Participant]) -> String {
    let names: Vec<String> = participants
        .iter()
        .map(|p| {
            let mut label = p.name.clone();
            if p.is_user {
                label.push_str(&format!(" ({})", t.you));
            }
            if p.status == ParticipantStatus::Speaking {
                label.push_str(" 🎙");
            }
            if let Some(note) = &p.last_note {
                label.push_str(&format!(" - {}", note));
            }
            label
        })
        .collect();
    format!("{} [{}]", t.participants, names.join(", "))
}

fn format_points(t: &Translations, points: &[InterestPoint]) -> String {
    let texts: Vec<String> = points
        .iter()
        .map(|p| {
            let kind = match p.kind {
                InterestKind::Goal => "goal",
                InterestKind::Context => "context",
                InterestKind::Tactic => "tactic",
            };
            format!("{}: {}", kind, p.text)
        })
        .collect();
    format!("{} [{}]", t.interest_points, texts.join("; "))
}

/// Render one event as a console line; `None` for events not worth printing
pub fn render_event(language: Language, event: &CoachEvent) -> Option<String> {
    let t = translations(language);
    let line = match event {
        CoachEvent::StatusChanged { status } => format!("● {}", t.status_label(*status)),
        CoachEvent::PhaseChanged { phase } => match phase {
            SessionPhase::Briefing => "Phase: briefing".to_string(),
            SessionPhase::Meeting => "Phase: meeting".to_string(),
        },
        CoachEvent::Transcript { fragment } => format!("{} {}", t.last_heard, fragment.trim()),
        CoachEvent::TurnCommitted { .. } => return None,
        CoachEvent::AdviceAdded { advice } => format!(
            "[{}] {} ({}) {}",
            advice.timestamp, advice.speaker, advice.category, advice.suggestion
        ),
        CoachEvent::ParticipantsUpdated { participants } if participants.is_empty() => return None,
        CoachEvent::ParticipantsUpdated { participants } => format_participants(t, participants),
        CoachEvent::InterestPointsUpdated { points } if points.is_empty() => return None,
        CoachEvent::InterestPointsUpdated { points } => format_points(t, points),
        CoachEvent::Thinking { active: true } => t.thinking.to_string(),
        CoachEvent::Thinking { active: false } => return None,
    };
    Some(line)
}

async fn print_events(mut events: broadcast::Receiver<CoachEvent>, language: watch::Receiver<Language>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                // Labels follow the active language
                let current = *language.borrow();
                if let Some(line) = render_event(current, &event) {
                    println!("{}", line);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Console fell behind, {} events skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn report(result: Result<(), SessionError>) {
    if let Err(e) = result {
        match &e {
            SessionError::Audio(audio) => error!("{} ({})", audio.user_message(), e),
            _ => warn!("{}", e),
        }
    }
}

async fn dispatch(handle: &SessionHandle, command: ConsoleCommand, language: &watch::Sender<Language>) -> bool {
    match command {
        ConsoleCommand::Start => report(handle.start().await),
        ConsoleCommand::Stop => report(handle.stop().await),
        ConsoleCommand::Meeting => report(handle.advance_phase().await),
        ConsoleCommand::Language(next) => {
            let result = handle.set_language(next).await;
            if result.is_ok() {
                let _ = language.send(next);
            }
            report(result);
        }
        ConsoleCommand::Help => {
            println!("Commands: start | stop | meeting | lang <en|fr|es> | quit");
        }
        ConsoleCommand::Quit => return false,
    }
    true
}

/// Wire the real transports to a session and drive it from stdin
pub async fn run_console(config: CoachConfig) -> Result<()> {
    info!("{:?}", config);

    let connector = Arc::new(GeminiLiveConnector::new(config.perception.clone(), config.api_key.clone()));
    let reasoning = create_provider(&config.reasoning, &config.api_key)?;
    let (language_tx, language_rx) = watch::channel(config.language);

    let session = CoachSession::new(config, connector, Arc::new(MicrophoneSource::new()), reasoning);
    let events = session.subscribe();
    let (handle, task) = spawn_session(session);
    let printer = tokio::spawn(print_events(events, language_rx));

    println!("Meeting coach ready. Type 'start' to begin, 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Some(command) => {
                if !dispatch(&handle, command, &language_tx).await {
                    break;
                }
            }
            None => println!("Unknown command: {}", line.trim()),
        }
    }

    handle.shutdown().await;
    task.await?;
    printer.abort();
    info!("Goodbye");
    Ok(())
}
