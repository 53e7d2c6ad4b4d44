// src/audio/mod.rs
//! Microphone capture and framing for the perception endpoint
//!
//! Capture runs on a dedicated thread that owns the `cpal` stream and pushes
//! fixed-size mono blocks into a bounded channel. The session side encodes
//! each block to 16 kHz PCM16 with a persistent resampler.

pub mod capture;
pub mod encoder;
pub mod processing;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub use capture::MicrophoneSource;
pub use encoder::{pcm16_le, FrameEncoder};

/// One block of mono samples in [-1.0, 1.0] at the capture sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No input device available")]
    NoInputDevice,
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("Input device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Audio stream failed: {0}")]
    StreamFailed(String),
    #[error("Audio encoder failed: {0}")]
    Encoder(String),
}

impl AudioError {
    /// Short explanation suitable for the console
    pub fn user_message(&self) -> &'static str {
        match self {
            AudioError::NoInputDevice => "No microphone found. Connect one and start again.",
            AudioError::PermissionDenied(_) => "Microphone access was denied. Check your system privacy settings.",
            AudioError::DeviceUnavailable(_) => "The microphone is busy or was disconnected.",
            AudioError::StreamFailed(_) | AudioError::Encoder(_) => "Audio capture failed. Try starting the session again.",
        }
    }
}

/// Stops the capture thread when released or dropped
#[derive(Debug)]
pub struct CaptureRelease {
    stop: Option<crossbeam::channel::Sender<()>>,
}

impl CaptureRelease {
    pub fn new(stop: crossbeam::channel::Sender<()>) -> Self {
        Self { stop: Some(stop) }
    }

    pub fn release(mut self) {
        self.signal();
    }

    fn signal(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The capture thread may already be gone
            let _ = stop.try_send(());
        }
    }
}

impl Drop for CaptureRelease {
    fn drop(&mut self) {
        self.signal();
    }
}

/// A running capture
#[derive(Debug)]
pub struct AudioStream {
    pub frames: mpsc::Receiver<AudioFrame>,
    pub sample_rate: u32,
    pub release: CaptureRelease,
}

/// Source of microphone audio
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Start capturing blocks of `block_size` mono samples
    async fn open(&self, block_size: usize) -> Result<AudioStream, AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_signals_once() {
        let (stop_tx, stop_rx) = crossbeam::channel::bounded(1);
        let release = CaptureRelease::new(stop_tx);
        release.release();

        assert!(stop_rx.try_recv().is_ok());
        // sender is gone after release
        assert!(matches!(
            stop_rx.try_recv(),
            Err(crossbeam::channel::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_drop_signals() {
        let (stop_tx, stop_rx) = crossbeam::channel::bounded(1);
        drop(CaptureRelease::new(stop_tx));
        assert!(stop_rx.try_recv().is_ok());
    }
}
