//! PCM sample conversion and transport encoding
//!
//! Converts between normalized f32 samples and the 16-bit little-endian PCM
//! byte format the streaming session exchanges, and between raw bytes and
//! the base64 text carried inside media blobs.

use crate::{PalaverError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};

/// Convert normalized f32 samples to 16-bit signed little-endian PCM bytes.
///
/// Samples are scaled by 32768 and clamped to the i16 range, so out-of-range
/// input saturates instead of wrapping.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode 16-bit little-endian PCM bytes into per-channel f32 sequences.
///
/// The buffer length must be a multiple of `2 * channels`; anything else is
/// rejected as malformed since the payload framing cannot be trusted.
pub fn pcm16_to_frames(bytes: &[u8], channels: usize) -> Result<Vec<Vec<f32>>> {
    if channels == 0 {
        return Err(PalaverError::ConfigError(
            "Channel count must be greater than 0".into(),
        ));
    }

    let stride = 2 * channels;
    if bytes.len() % stride != 0 {
        return Err(PalaverError::MalformedAudioData(format!(
            "{} bytes is not a multiple of the {}-byte frame stride ({} channels)",
            bytes.len(),
            stride,
            channels
        )));
    }

    let frame_count = bytes.len() / stride;
    let mut frames = vec![Vec::with_capacity(frame_count); channels];

    for i in 0..frame_count {
        for (c, channel) in frames.iter_mut().enumerate() {
            let offset = (i * channels + c) * 2;
            let value = i16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
            channel.push(value as f32 / 32768.0);
        }
    }

    Ok(frames)
}

/// Decode PCM bytes to a single mono sequence, averaging channels
pub fn pcm16_to_mono(bytes: &[u8], channels: usize) -> Result<Vec<f32>> {
    let frames = pcm16_to_frames(bytes, channels)?;

    if channels == 1 {
        return Ok(frames.into_iter().next().unwrap_or_default());
    }

    let frame_count = frames[0].len();
    let mut mono = Vec::with_capacity(frame_count);
    for i in 0..frame_count {
        let sum: f32 = frames.iter().map(|channel| channel[i]).sum();
        mono.push(sum / channels as f32);
    }

    Ok(mono)
}

/// Encode raw bytes as base64 transport text
pub fn encode_transport(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Decode base64 transport text back to raw bytes
pub fn decode_transport(text: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(text)
        .map_err(|e| PalaverError::MalformedAudioData(format!("Invalid base64 payload: {}", e)))
}

/// MIME-style tag for a raw PCM stream at the given sample rate
pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("audio/pcm;rate={}", sample_rate)
}
