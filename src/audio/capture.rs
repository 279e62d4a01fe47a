//! Capture pipeline: microphone frames to outbound media blobs
//!
//! A passive consumer invoked once per delivered frame, at whatever cadence
//! the device produces them. Each frame is resampled to the transport rate
//! when needed, converted to 16-bit PCM, and transport-encoded. No state is
//! carried across frames; back-pressure belongs to the transport.

use crate::audio::pcm;
use crate::audio::resampler::AudioResampler;
use crate::session::transport::MediaBlob;
use crate::Result;
use crossbeam_channel::Sender;

/// Seam for the microphone device.
///
/// `start` begins delivering fixed-size mono f32 frames on the given channel
/// and fails with `PermissionDenied` when the device is refused or
/// unavailable. `stop` is idempotent.
pub trait CaptureDevice {
    /// Sample rate the device delivers frames at
    fn sample_rate(&self) -> u32;

    /// Start delivering frames to the channel
    fn start(&mut self, frames: Sender<Vec<f32>>) -> Result<()>;

    /// Stop delivering frames
    fn stop(&mut self);
}

/// Per-frame encoder from capture samples to transport media blobs
pub struct CapturePipeline {
    resampler: Option<AudioResampler>,
    target_rate: u32,
}

impl CapturePipeline {
    /// Create a pipeline converting from the device rate to the transport rate
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self> {
        let resampler = if source_rate != target_rate {
            Some(AudioResampler::new(source_rate, target_rate)?)
        } else {
            None
        };

        Ok(Self {
            resampler,
            target_rate,
        })
    }

    /// Encode one captured frame into a transport media blob
    pub fn encode_frame(&mut self, frame: &[f32]) -> Result<MediaBlob> {
        let samples = match self.resampler.as_mut() {
            Some(resampler) => resampler.resample(frame)?,
            None => frame.to_vec(),
        };

        let bytes = pcm::float_to_pcm16(&samples);
        Ok(MediaBlob {
            data: pcm::encode_transport(&bytes),
            mime_type: pcm::pcm_mime_type(self.target_rate),
        })
    }

    /// Sample rate of the encoded output
    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }
}
