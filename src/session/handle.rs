// Session task: owns the CoachSession and serializes every input through one select! loop
use log::{debug, info, warn};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::controller::{CoachSession, SessionError};
use crate::coach::types::Language;

const COMMAND_CAPACITY: usize = 32;
const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub enum SessionCommand {
    Start(oneshot::Sender<Result<(), SessionError>>),
    Stop,
    AdvancePhase(oneshot::Sender<Result<(), SessionError>>),
    SetLanguage(Language, oneshot::Sender<Result<(), SessionError>>),
    Shutdown,
}

/// Cloneable front for the session task
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<(), SessionError>>) -> SessionCommand,
    ) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn start(&self) -> Result<(), SessionError> {
        self.request(SessionCommand::Start).await
    }

    pub async fn stop(&self) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::Stop)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn advance_phase(&self) -> Result<(), SessionError> {
        self.request(SessionCommand::AdvancePhase).await
    }

    pub async fn set_language(&self, language: Language) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::SetLanguage(language, reply)).await
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }
}

/// Move the session onto its own task
pub fn spawn_session(session: CoachSession) -> (SessionHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
    let task = tokio::spawn(run_session(session, commands_rx));
    (SessionHandle { commands: commands_tx }, task)
}

async fn recv_or_pending<T>(receiver: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match receiver {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

pub async fn run_session(mut session: CoachSession, mut commands: mpsc::Receiver<SessionCommand>) {
    let mut perception = None;
    let mut frames = None;
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!("Session task started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("All session handles dropped");
                    break;
                };
                match command {
                    SessionCommand::Start(reply) => {
                        let result = session.start().await.map(|streams| {
                            perception = Some(streams.perception);
                            frames = Some(streams.frames);
                        });
                        let _ = reply.send(result);
                    }
                    SessionCommand::Stop => session.stop(),
                    SessionCommand::AdvancePhase(reply) => {
                        let _ = reply.send(session.advance_phase());
                    }
                    SessionCommand::SetLanguage(language, reply) => {
                        let _ = reply.send(session.set_language(language));
                    }
                    SessionCommand::Shutdown => break,
                }
            }
            event = recv_or_pending(&mut perception) => match event {
                Some(event) => session.handle_perception_event(event),
                None => {
                    warn!("Perception link dropped without a close event");
                    session.handle_perception_event(crate::perception::PerceptionEvent::Closed {
                        reason: Some("link dropped".to_string()),
                    });
                }
            },
            frame = recv_or_pending(&mut frames) => match frame {
                Some(frame) => session.handle_audio_frame(frame),
                None => session.handle_capture_ended(),
            },
            Some(outcome) = session.next_reasoning_outcome() => {
                session.handle_reasoning_outcome(outcome);
            }
            _ = tick.tick() => session.on_tick(Instant::now()),
        }

        if !session.is_active() {
            perception = None;
            frames = None;
        }
    }

    session.stop();
    info!("Session task stopped");
}
