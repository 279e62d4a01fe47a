//! Sample-rate conversion between the device rates and the session rates
//!
//! The capture side runs at whatever rate the microphone delivers and must
//! hand 16 kHz mono to the transport; the playback side receives 24 kHz mono
//! and must match the output device. All audio in this crate is mono by the
//! time it reaches a resampler.

use crate::{PalaverError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Frames fed to the sinc resampler per processing call
const RESAMPLE_CHUNK_FRAMES: usize = 1024;

/// Mono audio resampler
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
}

impl AudioResampler {
    /// Create a resampler converting from `input_rate` to `output_rate`
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(PalaverError::ConfigError(
                "Sample rates must be greater than 0".into(),
            ));
        }

        let ratio = output_rate as f64 / input_rate as f64;

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler =
            SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK_FRAMES, 1).map_err(|e| {
                PalaverError::AudioProcessingError(format!("Failed to create resampler: {}", e))
            })?;

        debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
        })
    }

    /// Resample a mono sample buffer
    ///
    /// Input shorter than the processing chunk is zero-padded; the output is
    /// truncated back to the span corresponding to real input.
    pub fn resample(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let mut output = Vec::with_capacity((input.len() as f64 * ratio * 1.1) as usize);

        let mut offset = 0;
        while offset < input.len() {
            let remaining = input.len() - offset;
            let take = remaining.min(RESAMPLE_CHUNK_FRAMES);

            // SincFixedIn wants exactly RESAMPLE_CHUNK_FRAMES per call
            let mut chunk = vec![0.0f32; RESAMPLE_CHUNK_FRAMES];
            chunk[..take].copy_from_slice(&input[offset..offset + take]);

            let planar = self
                .resampler
                .process(&[chunk], None)
                .map_err(|e| {
                    PalaverError::AudioProcessingError(format!("Resampling failed: {}", e))
                })?;

            let produced = planar[0].len();
            let keep = if take < RESAMPLE_CHUNK_FRAMES {
                // Final partial chunk: drop the zero-padded tail
                ((take as f64) * ratio).ceil() as usize
            } else {
                produced
            };
            output.extend_from_slice(&planar[0][..keep.min(produced)]);

            offset += take;
        }

        Ok(output)
    }

    /// Get the input sample rate
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Get the output sample rate
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Reset the resampler state
    pub fn reset(&mut self) {
        self.resampler.reset();
    }
}

/// Resample a mono buffer in one step, passing through when rates match
pub fn resample_audio(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }

    let mut resampler = AudioResampler::new(input_rate, output_rate)?;
    resampler.resample(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation() {
        assert!(AudioResampler::new(48000, 16000).is_ok());
        assert!(AudioResampler::new(0, 16000).is_err());
        assert!(AudioResampler::new(16000, 0).is_err());
    }

    #[test]
    fn test_downsample_ratio() {
        let mut resampler = AudioResampler::new(48000, 16000).unwrap();
        let input: Vec<f32> = (0..4800).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resampler.resample(&input).unwrap();

        assert!(!output.is_empty());
        // Roughly a third of the input length
        assert!(output.len() < input.len() / 2);
    }

    #[test]
    fn test_upsample_ratio() {
        let mut resampler = AudioResampler::new(16000, 24000).unwrap();
        let input: Vec<f32> = (0..1600).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resampler.resample(&input).unwrap();

        assert!(output.len() > input.len());
    }

    #[test]
    fn test_empty_input() {
        let mut resampler = AudioResampler::new(48000, 16000).unwrap();
        assert!(resampler.resample(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_passthrough_when_rates_match() {
        let input = vec![0.1f32, 0.2, 0.3];
        let output = resample_audio(&input, 16000, 16000).unwrap();
        assert_eq!(output, input);
    }
}
