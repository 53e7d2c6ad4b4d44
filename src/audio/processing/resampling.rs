// Audio Processing - Resampling
use anyhow::Result;
use log::debug;
use rubato::{SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

/// Sinc parameters adapted to the conversion ratio (target / source)
pub fn sinc_parameters(ratio: f64) -> SincInterpolationParameters {
    let (sinc_len, interpolation, oversampling_factor) = if ratio >= 2.0 {
        (512, SincInterpolationType::Cubic, 512)
    } else if ratio >= 1.5 {
        (384, SincInterpolationType::Cubic, 384)
    } else if ratio > 1.0 {
        (256, SincInterpolationType::Linear, 256)
    } else if ratio <= 0.5 {
        // Anti-aliased downsampling, e.g. 48 kHz -> 16 kHz
        (512, SincInterpolationType::Cubic, 512)
    } else {
        (384, SincInterpolationType::Linear, 384)
    };

    SincInterpolationParameters {
        sinc_len,
        f_cutoff: 0.95,
        interpolation,
        oversampling_factor,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Mono resampler consuming fixed chunks of `chunk_size` input samples.
///
/// Kept alive across chunks so the filter state carries over block
/// boundaries instead of clicking at every block.
pub fn create_resampler(from_sample_rate: u32, to_sample_rate: u32, chunk_size: usize) -> Result<SincFixedIn<f32>> {
    let ratio = to_sample_rate as f64 / from_sample_rate as f64;
    debug!(
        "Creating resampler {}Hz → {}Hz (ratio: {:.3}, chunk: {})",
        from_sample_rate, to_sample_rate, ratio, chunk_size
    );
    let resampler = SincFixedIn::<f32>::new(ratio, 2.0, sinc_parameters(ratio), chunk_size, 1)?;
    Ok(resampler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rubato::Resampler;

    #[test]
    fn test_downsampling_parameters() {
        let params = sinc_parameters(16000.0 / 48000.0);
        assert_eq!(params.sinc_len, 512);

        let params = sinc_parameters(16000.0 / 22050.0);
        assert_eq!(params.sinc_len, 384);
    }

    #[test]
    fn test_resampler_chunk_size() {
        let resampler = create_resampler(48000, 16000, 4096).unwrap();
        assert_eq!(resampler.input_frames_next(), 4096);
        assert_eq!(resampler.nbr_channels(), 1);
    }
}
