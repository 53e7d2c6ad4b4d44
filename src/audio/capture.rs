//! Default input device capture
//!
//! `cpal` streams are not `Send`, so the stream lives on its own thread for
//! the whole capture and is dropped there once the release handle fires.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use log::{error, info, warn};
use tokio::sync::{mpsc, oneshot};

use super::{AudioError, AudioFrame, AudioSource, AudioStream, CaptureRelease};

/// Blocks buffered between the capture thread and the session
const FRAME_QUEUE: usize = 32;

/// Microphone capture from the host's default input device
#[derive(Debug, Default, Clone)]
pub struct MicrophoneSource;

impl MicrophoneSource {
    pub fn new() -> Self {
        Self
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> AudioError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            AudioError::DeviceUnavailable("device not available".to_string())
        }
        cpal::BuildStreamError::BackendSpecific { err } => {
            let description = err.description;
            if description.to_lowercase().contains("permission") || description.contains("denied") {
                AudioError::PermissionDenied(description)
            } else {
                AudioError::StreamFailed(description)
            }
        }
        other => AudioError::StreamFailed(other.to_string()),
    }
}

/// Stream error callback. A vanished device wakes the capture thread, which
/// drops the stream and with it the frame sender, closing the session's queue.
fn on_stream_error(err: cpal::StreamError, stop_tx: &crossbeam::channel::Sender<()>) {
    match err {
        cpal::StreamError::DeviceNotAvailable => {
            error!("Input device disconnected, ending capture");
            let _ = stop_tx.try_send(());
        }
        other => error!("Audio input stream error: {}", other),
    }
}

/// Downmix interleaved input to mono and emit fixed-size blocks
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    block_size: usize,
    frames_tx: mpsc::Sender<AudioFrame>,
    stop_tx: crossbeam::channel::Sender<()>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = (config.channels as usize).max(1);
    let mut block: Vec<f32> = Vec::with_capacity(block_size);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                    block.push(sum / frame.len() as f32);

                    if block.len() >= block_size {
                        let samples = std::mem::replace(&mut block, Vec::with_capacity(block_size));
                        if frames_tx.try_send(AudioFrame { samples }).is_err() {
                            perf_trace!("Audio block dropped, session queue full");
                        }
                    }
                }
            },
            move |err| on_stream_error(err, &stop_tx),
            None,
        )
        .map_err(map_build_error)
}

/// Runs on the capture thread: opens the device and reports the sample rate
fn start_capture(
    block_size: usize,
    frames_tx: mpsc::Sender<AudioFrame>,
    stop_tx: crossbeam::channel::Sender<()>,
) -> Result<(cpal::Stream, u32), AudioError> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or(AudioError::NoInputDevice)?;

    info!(
        "🎤 Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
    let sample_rate = supported.sample_rate().0;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    info!(
        "🔧 Input config: {} Hz, {} channel(s), {:?}",
        sample_rate, config.channels, sample_format
    );

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, block_size, frames_tx, stop_tx)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, block_size, frames_tx, stop_tx)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, block_size, frames_tx, stop_tx)?,
        SampleFormat::I32 => build_stream::<i32>(&device, &config, block_size, frames_tx, stop_tx)?,
        other => {
            return Err(AudioError::StreamFailed(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamFailed(e.to_string()))?;

    Ok((stream, sample_rate))
}

#[async_trait]
impl AudioSource for MicrophoneSource {
    async fn open(&self, block_size: usize) -> Result<AudioStream, AudioError> {
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_QUEUE);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<u32, AudioError>>();
        let (stop_tx, stop_rx) = crossbeam::channel::bounded::<()>(1);
        let device_lost_tx = stop_tx.clone();

        std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || match start_capture(block_size, frames_tx, device_lost_tx) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    // Blocks until released or the device goes away
                    let _ = stop_rx.recv();
                    // Dropping the stream drops the frame sender with it
                    drop(stream);
                    info!("🎤 Microphone released");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| AudioError::StreamFailed(format!("failed to spawn capture thread: {}", e)))?;

        let sample_rate = match ready_rx.await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Capture thread exited before reporting");
                return Err(AudioError::StreamFailed("capture thread exited".to_string()));
            }
        };

        info!("✅ Microphone capture started ({} Hz, {} samples per block)", sample_rate, block_size);

        Ok(AudioStream {
            frames: frames_rx,
            sample_rate,
            release: CaptureRelease::new(stop_tx),
        })
    }
}
