//! Session controller - the single owner of all live session state
//!
//! `CoachSession` holds the perception link, the capture release handle and
//! the meeting data. Every mutation happens through `&mut self` from the one
//! task that drives it (see [`super::handle::run_session`]), so nothing here
//! is locked. Reasoning calls run on spawned tasks and come back as
//! [`ReasoningOutcome`]s tagged with the generation they were issued under.

use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use super::events::CoachEvent;
use super::state::MeetingState;
use crate::audio::{AudioError, AudioFrame, AudioSource, CaptureRelease, FrameEncoder};
use crate::coach::tools::{parse_tool_call, tool_declarations, SpeakerActivity, ToolInvocation};
use crate::coach::types::{ConnectionStatus, Language, SessionPhase, COACH_SPEAKER};
use crate::coach::CoachThrottle;
use crate::config::CoachConfig;
use crate::llm_engine::{CoachAnalysis, CoachingPrompt, ReasoningError, ReasoningProvider};
use crate::localization::translations;
use crate::perception::{
    build_setup_message, FunctionResponse, PerceptionConnector, PerceptionError, PerceptionEvent,
    PerceptionSender,
};
use crate::prompts;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A session is already active")]
    AlreadyActive,
    #[error("The language cannot change while a session is live")]
    LanguageLocked,
    #[error("The session is not connected")]
    NotConnected,
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Perception(#[from] PerceptionError),
    #[error("Session task is no longer running")]
    Closed,
}

/// Result of one reasoning call, tagged with the session it belongs to
#[derive(Debug)]
pub struct ReasoningOutcome {
    pub generation: u64,
    pub result: Result<CoachAnalysis, ReasoningError>,
}

/// Receivers handed to the driving loop when a session starts
#[derive(Debug)]
pub struct SessionStreams {
    pub perception: mpsc::Receiver<PerceptionEvent>,
    pub frames: mpsc::Receiver<AudioFrame>,
}

/// Resources that exist only while connected
struct ActiveSession {
    sender: PerceptionSender,
    capture: CaptureRelease,
    encoder: FrameEncoder,
}

pub struct CoachSession {
    config: CoachConfig,
    language: Language,
    status: ConnectionStatus,
    phase: SessionPhase,
    generation: u64,
    meeting: MeetingState,
    throttle: CoachThrottle,
    active: Option<ActiveSession>,
    connector: Arc<dyn PerceptionConnector>,
    audio: Arc<dyn AudioSource>,
    reasoning: Arc<dyn ReasoningProvider>,
    outcome_tx: mpsc::UnboundedSender<ReasoningOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<ReasoningOutcome>,
    events: broadcast::Sender<CoachEvent>,
}

impl CoachSession {
    pub fn new(
        config: CoachConfig,
        connector: Arc<dyn PerceptionConnector>,
        audio: Arc<dyn AudioSource>,
        reasoning: Arc<dyn ReasoningProvider>,
    ) -> Self {
        let language = config.language;
        let meeting = MeetingState::new(language, config.coaching.min_turn_chars, Instant::now());
        let throttle = CoachThrottle::new(config.coaching.cooldown, config.coaching.context_turns);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            config,
            language,
            status: ConnectionStatus::Disconnected,
            phase: SessionPhase::Briefing,
            generation: 0,
            meeting,
            throttle,
            active: None,
            connector,
            audio,
            reasoning,
            outcome_tx,
            outcome_rx,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoachEvent> {
        self.events.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn meeting(&self) -> &MeetingState {
        &self.meeting
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn emit(&self, event: CoachEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            info!("Session status: {:?} -> {:?}", self.status, status);
            self.status = status;
            self.emit(CoachEvent::StatusChanged { status });
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(CoachEvent::PhaseChanged { phase });
        }
    }

    fn push_system_message(&mut self, text: &str) {
        let advice = self.meeting.advice.push_system_message(text, Instant::now()).clone();
        self.emit(CoachEvent::AdviceAdded { advice });
    }

    fn emit_participants(&self) {
        self.emit(CoachEvent::ParticipantsUpdated {
            participants: self.meeting.roster.participants().to_vec(),
        });
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open the microphone and the perception link.
    ///
    /// On success the returned streams must be polled by the caller and fed
    /// back through the `handle_*` methods.
    pub async fn start(&mut self) -> Result<SessionStreams, SessionError> {
        if !self.status.can_start() {
            warn!("Start ignored, session is {:?}", self.status);
            return Err(SessionError::AlreadyActive);
        }

        self.generation += 1;
        self.meeting.reset(self.language, Instant::now());
        self.throttle.reset();
        self.set_phase(SessionPhase::Briefing);
        self.emit_participants();
        self.emit(CoachEvent::InterestPointsUpdated { points: Vec::new() });
        self.set_status(ConnectionStatus::Connecting);
        info!("🚀 Starting coaching session #{} ({})", self.generation, self.language);

        let stream = match self.audio.open(self.config.audio.block_size).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Microphone start failed: {}", e);
                self.set_status(ConnectionStatus::Error);
                return Err(e.into());
            }
        };

        let encoder = match FrameEncoder::new(
            stream.sample_rate,
            self.config.audio.target_sample_rate,
            self.config.audio.block_size,
        ) {
            Ok(encoder) => encoder,
            Err(e) => {
                error!("Audio encoder setup failed: {}", e);
                stream.release.release();
                self.set_status(ConnectionStatus::Error);
                return Err(AudioError::Encoder(e.to_string()).into());
            }
        };

        let setup = build_setup_message(
            &self.config.perception.model,
            prompts::perception_instruction(self.language),
            tool_declarations(),
        );
        let link = match self.connector.connect(setup).await {
            Ok(link) => link,
            Err(e) => {
                error!("Perception connect failed: {}", e);
                stream.release.release();
                self.set_status(ConnectionStatus::Error);
                return Err(e.into());
            }
        };

        self.active = Some(ActiveSession {
            sender: link.sender,
            capture: stream.release,
            encoder,
        });
        self.push_system_message(translations(self.language).welcome_message);
        self.set_status(ConnectionStatus::Connected);
        info!("✅ Session connected");

        Ok(SessionStreams {
            perception: link.events,
            frames: stream.frames,
        })
    }

    /// Explicit stop from the user
    pub fn stop(&mut self) {
        if self.active.is_none() && !self.status.is_live() {
            debug!("Stop ignored, no live session");
            return;
        }
        info!("🛑 Stopping session #{}", self.generation);
        self.release(ConnectionStatus::Disconnected);
    }

    /// Tear down the link and the microphone, then settle on `next`
    fn release(&mut self, next: ConnectionStatus) {
        if let Some(active) = self.active.take() {
            active.sender.close();
            active.capture.release();
        }
        if self.throttle.is_in_flight() {
            self.throttle.abandon_in_flight();
            self.emit(CoachEvent::Thinking { active: false });
        }
        self.set_status(next);
    }

    /// Briefing -> meeting, on explicit user action only
    pub fn advance_phase(&mut self) -> Result<(), SessionError> {
        if self.status != ConnectionStatus::Connected {
            return Err(SessionError::NotConnected);
        }
        if self.phase == SessionPhase::Meeting {
            return Ok(());
        }
        self.set_phase(SessionPhase::Meeting);
        self.push_system_message(translations(self.language).ready_message);
        info!("Meeting phase started");
        Ok(())
    }

    pub fn set_language(&mut self, language: Language) -> Result<(), SessionError> {
        if self.status.is_live() {
            return Err(SessionError::LanguageLocked);
        }
        self.language = language;
        self.meeting.roster.set_language(language);
        info!("Language set to {}", language.english_name());
        Ok(())
    }

    // ========================================================================
    // Perception side
    // ========================================================================

    pub fn handle_perception_event(&mut self, event: PerceptionEvent) {
        match event {
            PerceptionEvent::SetupComplete => debug!("Late setupComplete ignored"),
            PerceptionEvent::InputTranscript { text } => {
                self.meeting.turns.push_fragment(&text);
                self.emit(CoachEvent::Transcript { fragment: text });
            }
            PerceptionEvent::TurnComplete => {
                let timestamp = chrono::Utc::now().timestamp_millis();
                if let Some(turn) = self.meeting.turns.complete_turn(timestamp).cloned() {
                    debug!("Turn committed: {}: {}", turn.speaker, turn.text);
                    self.emit(CoachEvent::TurnCommitted { turn });
                    self.request_coaching(Instant::now());
                }
            }
            PerceptionEvent::ToolCall { id, name, args } => {
                self.apply_tool_call(id, name, &args);
            }
            PerceptionEvent::GoAway { time_left } => {
                warn!("Perception endpoint will close soon (time left: {:?})", time_left);
            }
            PerceptionEvent::Closed { reason } => {
                info!("Perception link closed: {:?}", reason);
                self.release(ConnectionStatus::Disconnected);
            }
            PerceptionEvent::Error { message } => {
                error!("Perception link error: {}", message);
                self.release(ConnectionStatus::Error);
            }
        }
    }

    /// Validate, apply and acknowledge one tool call.
    ///
    /// Malformed or unknown calls never touch the meeting data but are still
    /// acknowledged with an error payload.
    fn apply_tool_call(&mut self, id: String, name: String, args: &serde_json::Value) {
        let response = match parse_tool_call(&name, args) {
            Ok(invocation) => {
                let ack = invocation.acknowledgement();
                match invocation {
                    ToolInvocation::SpeakerActivity(activity) => self.observe_speaker(activity),
                    ToolInvocation::InterestPoints(points) => {
                        debug!("Interest points replaced ({})", points.len());
                        self.meeting.interest_points = points;
                        self.emit(CoachEvent::InterestPointsUpdated {
                            points: self.meeting.interest_points.clone(),
                        });
                    }
                }
                ack
            }
            Err(e) => {
                warn!("Rejected tool call {} ({}): {}", name, id, e);
                e.acknowledgement()
            }
        };

        match &self.active {
            Some(active) => active.sender.acknowledge(FunctionResponse { id, name, response }),
            None => debug!("Tool call {} arrived without a live link", id),
        }
    }

    fn observe_speaker(&mut self, activity: SpeakerActivity) {
        let name = self
            .meeting
            .roster
            .observe(&activity.speaker, activity.category, &activity.observation);
        self.meeting.turns.attribute_speaker(&name);
        self.emit_participants();

        if let Some(suggestion) = activity.suggestion {
            let advice = self
                .meeting
                .advice
                .push(
                    activity.category.advice_category(),
                    activity.observation,
                    suggestion,
                    name,
                    Instant::now(),
                )
                .clone();
            self.emit(CoachEvent::AdviceAdded { advice });
        }
    }

    pub fn handle_audio_frame(&mut self, frame: AudioFrame) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        match active.encoder.encode(&frame.samples) {
            Ok(pcm) if pcm.is_empty() => {}
            Ok(pcm) => {
                if !active.sender.send_audio(pcm) {
                    perf_trace!("Audio chunk dropped, perception queue full");
                }
            }
            Err(e) => warn!("Audio chunk dropped, encoder failed: {}", e),
        }
    }

    /// The capture thread stopped delivering frames
    pub fn handle_capture_ended(&mut self) {
        if self.active.is_some() {
            error!("Microphone stream ended unexpectedly");
            self.release(ConnectionStatus::Error);
        }
    }

    // ========================================================================
    // Reasoning side
    // ========================================================================

    /// Issue a reasoning call if the throttle allows one
    pub fn request_coaching(&mut self, now: Instant) -> bool {
        if self.status != ConnectionStatus::Connected {
            return false;
        }
        let Some(request) = self.throttle.try_acquire(now, &self.meeting.turns) else {
            return false;
        };

        debug!(
            "Requesting coaching from {} ({} turns)",
            self.reasoning.provider_name(),
            request.turn_count
        );
        if self.throttle.in_flight_count() == 1 {
            self.emit(CoachEvent::Thinking { active: true });
        }

        let prompt = CoachingPrompt {
            system_instruction: prompts::coach_instruction(self.language),
            context: request.context,
        };
        let provider = self.reasoning.clone();
        let outcome_tx = self.outcome_tx.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let result = provider.analyze(&prompt).await;
            // The receiver lives as long as the session
            let _ = outcome_tx.send(ReasoningOutcome { generation, result });
        });
        true
    }

    /// Periodic retry for turns that arrived during the cooldown
    pub fn on_tick(&mut self, now: Instant) {
        if self.status == ConnectionStatus::Connected
            && self.throttle.has_pending_turns(&self.meeting.turns)
        {
            self.request_coaching(now);
        }
    }

    pub async fn next_reasoning_outcome(&mut self) -> Option<ReasoningOutcome> {
        self.outcome_rx.recv().await
    }

    pub fn handle_reasoning_outcome(&mut self, outcome: ReasoningOutcome) {
        if outcome.generation != self.generation || self.status != ConnectionStatus::Connected {
            debug!(
                "Discarding reasoning result from session #{} (current #{}, {:?})",
                outcome.generation, self.generation, self.status
            );
            return;
        }

        self.throttle.finish();
        if !self.throttle.is_in_flight() {
            self.emit(CoachEvent::Thinking { active: false });
        }

        match outcome.result {
            Ok(analysis) => self.apply_analysis(analysis),
            Err(e) => warn!("Coaching request failed: {}", e),
        }
    }

    fn apply_analysis(&mut self, analysis: CoachAnalysis) {
        let speaker = analysis
            .speaker
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| COACH_SPEAKER.to_string());

        let advice = self
            .meeting
            .advice
            .push(
                analysis.category,
                analysis.observation,
                analysis.suggestion,
                speaker,
                Instant::now(),
            )
            .clone();
        info!("💡 [{}] {}", advice.category, advice.suggestion);
        self.emit(CoachEvent::AdviceAdded { advice });

        self.meeting.roster.reconcile_detected(&analysis.detected_speakers);
        self.emit_participants();
    }
}
