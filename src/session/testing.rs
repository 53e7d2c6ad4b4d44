// In-process fakes for the session's three seams
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::audio::{AudioError, AudioFrame, AudioSource, AudioStream, CaptureRelease};
use crate::coach::types::AdviceCategory;
use crate::config::CoachConfig;
use crate::llm_engine::{CoachAnalysis, CoachingPrompt, ReasoningError, ReasoningProvider};
use crate::perception::{
    OutboundMessage, PerceptionConnector, PerceptionError, PerceptionEvent, PerceptionLink,
    SetupMessage,
};

use super::controller::CoachSession;

/// Test side of one fake perception connection
pub struct PerceptionTap {
    pub outbound: mpsc::Receiver<OutboundMessage>,
    pub events: mpsc::Sender<PerceptionEvent>,
}

#[derive(Default)]
pub struct FakeConnector {
    pub fail: bool,
    pub setups: Mutex<Vec<SetupMessage>>,
    pub taps: Mutex<Vec<PerceptionTap>>,
}

impl FakeConnector {
    pub fn take_tap(&self) -> PerceptionTap {
        self.taps.lock().unwrap().pop().expect("no perception connection was opened")
    }
}

#[async_trait]
impl PerceptionConnector for FakeConnector {
    async fn connect(&self, setup: SetupMessage) -> Result<PerceptionLink, PerceptionError> {
        self.setups.lock().unwrap().push(setup);
        if self.fail {
            return Err(PerceptionError::Connect("connection refused".to_string()));
        }
        let (link, outbound, events) = PerceptionLink::channel_pair();
        self.taps.lock().unwrap().push(PerceptionTap { outbound, events });
        Ok(link)
    }
}

/// Test side of one fake capture
pub struct CaptureTap {
    pub frames: mpsc::Sender<AudioFrame>,
    pub stop: crossbeam::channel::Receiver<()>,
}

impl CaptureTap {
    pub fn was_released(&self) -> bool {
        self.stop.try_recv().is_ok()
    }
}

pub struct FakeAudio {
    pub fail: bool,
    pub sample_rate: u32,
    pub taps: Mutex<Vec<CaptureTap>>,
}

impl Default for FakeAudio {
    fn default() -> Self {
        Self {
            fail: false,
            sample_rate: 16000,
            taps: Mutex::new(Vec::new()),
        }
    }
}

impl FakeAudio {
    pub fn take_tap(&self) -> CaptureTap {
        self.taps.lock().unwrap().pop().expect("no capture was opened")
    }
}

#[async_trait]
impl AudioSource for FakeAudio {
    async fn open(&self, _block_size: usize) -> Result<AudioStream, AudioError> {
        if self.fail {
            return Err(AudioError::PermissionDenied("denied by test".to_string()));
        }
        let (frames_tx, frames_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = crossbeam::channel::bounded(1);
        self.taps.lock().unwrap().push(CaptureTap {
            frames: frames_tx,
            stop: stop_rx,
        });
        Ok(AudioStream {
            frames: frames_rx,
            sample_rate: self.sample_rate,
            release: CaptureRelease::new(stop_tx),
        })
    }
}

#[derive(Default)]
pub struct FakeReasoning {
    pub responses: Mutex<VecDeque<Result<CoachAnalysis, ReasoningError>>>,
    pub prompts: Mutex<Vec<CoachingPrompt>>,
}

impl FakeReasoning {
    pub fn respond(&self, result: Result<CoachAnalysis, ReasoningError>) {
        self.responses.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ReasoningProvider for FakeReasoning {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn analyze(&self, prompt: &CoachingPrompt) -> Result<CoachAnalysis, ReasoningError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReasoningError::RequestFailed("no scripted response".to_string())))
    }
}

pub fn analysis(suggestion: &str, detected: &[&str]) -> CoachAnalysis {
    CoachAnalysis {
        category: AdviceCategory::Negotiation,
        observation: "price pressure".to_string(),
        suggestion: suggestion.to_string(),
        detected_speakers: detected.iter().map(|s| s.to_string()).collect(),
        speaker: None,
    }
}

pub struct Harness {
    pub connector: Arc<FakeConnector>,
    pub audio: Arc<FakeAudio>,
    pub reasoning: Arc<FakeReasoning>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeConnector::default(), FakeAudio::default())
    }

    pub fn with(connector: FakeConnector, audio: FakeAudio) -> Self {
        Self {
            connector: Arc::new(connector),
            audio: Arc::new(audio),
            reasoning: Arc::new(FakeReasoning::default()),
        }
    }

    pub fn session(&self) -> CoachSession {
        let mut config = CoachConfig::default();
        config.api_key = "test-key".to_string();
        config.coaching.cooldown = Duration::from_secs(5);
        CoachSession::new(
            config,
            self.connector.clone(),
            self.audio.clone(),
            self.reasoning.clone(),
        )
    }
}
