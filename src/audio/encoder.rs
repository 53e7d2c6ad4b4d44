// Frame encoder: capture-rate mono blocks -> target-rate PCM16 little-endian
use anyhow::{anyhow, Result};
use rubato::{Resampler, SincFixedIn};

use super::processing::create_resampler;

/// Convert samples in [-1.0, 1.0] to PCM16 little-endian bytes, clamping overs
pub fn pcm16_le(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

pub struct FrameEncoder {
    /// None when the capture rate already matches the target
    resampler: Option<SincFixedIn<f32>>,
    input_buffer: Vec<f32>,
    source_rate: u32,
    target_rate: u32,
}

impl FrameEncoder {
    pub fn new(source_rate: u32, target_rate: u32, chunk_size: usize) -> Result<Self> {
        if source_rate == 0 || target_rate == 0 || chunk_size == 0 {
            return Err(anyhow!(
                "invalid encoder settings: {} Hz -> {} Hz, chunk {}",
                source_rate,
                target_rate,
                chunk_size
            ));
        }

        let resampler = if source_rate == target_rate {
            None
        } else {
            Some(create_resampler(source_rate, target_rate, chunk_size)?)
        };

        Ok(Self {
            resampler,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            source_rate,
            target_rate,
        })
    }

    pub fn needs_resampling(&self) -> bool {
        self.resampler.is_some()
    }

    /// Encode one block. Samples short of a full resampler chunk are held
    /// back for the next call, so the output can be empty.
    pub fn encode(&mut self, samples: &[f32]) -> Result<Vec<u8>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(pcm16_le(samples));
        };

        self.input_buffer.extend_from_slice(samples);
        let mut output = Vec::new();

        loop {
            let needed = resampler.input_frames_next();
            if self.input_buffer.len() < needed {
                break;
            }
            let waves_in = vec![self.input_buffer.drain(..needed).collect::<Vec<f32>>()];
            let waves_out = resampler.process(&waves_in, None)?;
            if let Some(channel) = waves_out.into_iter().next() {
                output.extend(channel);
            }
        }

        perf_debug!(
            "Encoded {} samples at {} Hz into {} samples at {} Hz ({} buffered)",
            samples.len(),
            self.source_rate,
            output.len(),
            self.target_rate,
            self.input_buffer.len()
        );

        Ok(pcm16_le(&output))
    }
}
