pub mod capture;
#[cfg(feature = "audio-io")]
pub mod input;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod pcm;
pub mod playback;
pub mod resampler;
pub mod wav;

pub use capture::{CaptureDevice, CapturePipeline};
#[cfg(feature = "audio-io")]
pub use input::AudioInput;
#[cfg(feature = "audio-io")]
pub use output::AudioOutput;
pub use playback::{OutputClock, PlaybackChunk, PlaybackScheduler, PlaybackSink, SourceId};
pub use resampler::AudioResampler;
pub use wav::{read_wav, write_wav};
