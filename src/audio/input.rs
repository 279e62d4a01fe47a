//! Microphone capture via cpal

use crate::audio::capture::CaptureDevice;
use crate::{PalaverError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Samples per delivered capture frame
pub const CAPTURE_FRAME_SIZE: usize = 4096;

/// Default microphone, delivering mono frames of [`CAPTURE_FRAME_SIZE`]
/// samples at the device's native rate
pub struct AudioInput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    is_capturing: Arc<Mutex<bool>>,
}

impl AudioInput {
    /// Open the default input device.
    ///
    /// An absent or refused device surfaces as `PermissionDenied`; the user
    /// has to grant access and retry manually.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host.default_input_device().ok_or_else(|| {
            PalaverError::PermissionDenied("No input device available".into())
        })?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| {
                PalaverError::PermissionDenied(format!("Failed to get input config: {}", e))
            })?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            is_capturing: Arc::new(Mutex::new(false)),
        })
    }

    /// Check if currently capturing
    pub fn is_capturing(&self) -> bool {
        *self.is_capturing.lock()
    }
}

impl CaptureDevice for AudioInput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn start(&mut self, frames: Sender<Vec<f32>>) -> Result<()> {
        if *self.is_capturing.lock() {
            warn!("Already capturing");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let is_capturing = Arc::clone(&self.is_capturing);
        let mut pending: Vec<f32> = Vec::with_capacity(CAPTURE_FRAME_SIZE);

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !*is_capturing.lock() {
                        return;
                    }

                    // Mix down to mono and accumulate into fixed-size frames
                    for frame in data.chunks(channels) {
                        let sample = frame.iter().sum::<f32>() / channels as f32;
                        pending.push(sample);

                        if pending.len() == CAPTURE_FRAME_SIZE {
                            if let Err(e) = frames.try_send(std::mem::replace(
                                &mut pending,
                                Vec::with_capacity(CAPTURE_FRAME_SIZE),
                            )) {
                                debug!("Failed to send capture frame: {}", e);
                            }
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                PalaverError::PermissionDenied(format!("Failed to build input stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            PalaverError::AudioDeviceError(format!("Failed to start input stream: {}", e))
        })?;

        *self.is_capturing.lock() = true;
        self.stream = Some(stream);

        info!("Started microphone capture");
        Ok(())
    }

    fn stop(&mut self) {
        *self.is_capturing.lock() = false;

        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped microphone capture");
        }
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_input_creation() {
        // May fail in CI environments without audio devices
        if let Ok(input) = AudioInput::new() {
            assert!(input.sample_rate() > 0);
            assert!(!input.is_capturing());
        }
    }

    #[test]
    fn test_capture_state() {
        if let Ok(mut input) = AudioInput::new() {
            let (tx, _rx) = bounded(10);
            if input.start(tx).is_ok() {
                assert!(input.is_capturing());

                input.stop();
                assert!(!input.is_capturing());

                // Idempotent
                input.stop();
                assert!(!input.is_capturing());
            }
        }
    }
}
