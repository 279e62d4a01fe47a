//! WAV file handling for session recordings

use crate::{PalaverError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;
use tracing::{debug, info};

/// Write mono f32 samples (range -1.0 to 1.0) to a 16-bit WAV file
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec)
        .map_err(|e| PalaverError::IOError(format!("Failed to create WAV writer: {}", e)))?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(value)
            .map_err(|e| PalaverError::IOError(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| PalaverError::IOError(format!("Failed to finalize WAV file: {}", e)))?;

    info!("Wrote {} samples to {:?}", samples.len(), path.as_ref());
    Ok(())
}

/// Read samples from a WAV file
///
/// Returns (samples, sample_rate, channels); samples stay interleaved for
/// multi-channel files.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, u32, u16)> {
    let mut reader = WavReader::open(path.as_ref())
        .map_err(|e| PalaverError::IOError(format!("Failed to open WAV file: {}", e)))?;

    let spec = reader.spec();
    debug!(
        "Reading WAV file: {} Hz, {} channels, {} bits",
        spec.sample_rate, spec.channels, spec.bits_per_sample
    );

    let samples: Result<Vec<f32>> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .map(|s| s.map_err(|e| PalaverError::IOError(format!("Failed to read sample: {}", e))))
            .collect(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| {
                s.map(|sample| sample as f32 / i16::MAX as f32)
                    .map_err(|e| PalaverError::IOError(format!("Failed to read sample: {}", e)))
            })
            .collect(),
        (SampleFormat::Int, bits) => {
            return Err(PalaverError::AudioProcessingError(format!(
                "Unsupported bit depth: {}",
                bits
            )))
        }
    };

    Ok((samples?, spec.sample_rate, spec.channels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_write_read_round_trip() {
        let path = std::env::temp_dir().join("palaver_wav_test.wav");

        let sample_rate = 24000;
        let samples: Vec<f32> = (0..sample_rate as usize)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();

        write_wav(&path, &samples, sample_rate).unwrap();
        let (read_samples, read_rate, read_channels) = read_wav(&path).unwrap();

        assert_eq!(read_rate, sample_rate);
        assert_eq!(read_channels, 1);
        assert_eq!(read_samples.len(), samples.len());
        for (original, read) in samples.iter().zip(read_samples.iter()) {
            assert!((original - read).abs() < 0.001);
        }

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file() {
        let result = read_wav("/nonexistent/palaver.wav");
        assert!(matches!(result, Err(PalaverError::IOError(_))));
    }
}
