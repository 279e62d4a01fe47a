//! Speaker playback via cpal
//!
//! Scheduled chunks are mixed into a mono sample timeline at their start
//! offsets; the device callback drains the timeline front and advances a
//! sample-accurate clock. Stopping a chunk zeroes its unplayed remainder, so
//! barge-in silences the output immediately instead of letting queued audio
//! drain.

use crate::audio::playback::{OutputClock, PlaybackChunk, PlaybackSink, SourceId};
use crate::audio::resampler::resample_audio;
use crate::{PalaverError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, info, warn};

struct Span {
    id: SourceId,
    start: u64,
    end: u64,
}

struct TimelineState {
    /// Mono samples at the device rate, indexed from `played`
    timeline: VecDeque<f32>,

    /// Samples the device has consumed since the stream started
    played: u64,

    /// Scheduled chunk regions, in absolute sample indices
    spans: Vec<Span>,

    playing: bool,
}

impl TimelineState {
    fn new() -> Self {
        Self {
            timeline: VecDeque::new(),
            played: 0,
            spans: Vec::new(),
            playing: false,
        }
    }
}

/// Default output device with a schedulable sample timeline
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    shared: Arc<Mutex<TimelineState>>,
    ended_tx: Sender<SourceId>,
    ended_rx: Receiver<SourceId>,
}

impl AudioOutput {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| PalaverError::AudioDeviceError("No output device available".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_output_config()
            .map_err(|e| {
                PalaverError::AudioDeviceError(format!("Failed to get output config: {}", e))
            })?
            .into();

        let (ended_tx, ended_rx) = bounded(256);

        Ok(Self {
            device,
            config,
            stream: None,
            shared: Arc::new(Mutex::new(TimelineState::new())),
            ended_tx,
            ended_rx,
        })
    }

    /// Get the sample rate of the output device
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Monotonic device clock handle
    pub fn clock(&self) -> DeviceClock {
        DeviceClock {
            shared: Arc::clone(&self.shared),
            sample_rate: self.sample_rate(),
        }
    }

    /// Scheduling sink handle
    pub fn sink(&self) -> DeviceSink {
        DeviceSink {
            shared: Arc::clone(&self.shared),
            sample_rate: self.sample_rate(),
        }
    }

    /// Receiver of naturally finished chunk ids
    pub fn completions(&self) -> Receiver<SourceId> {
        self.ended_rx.clone()
    }

    /// Start the output stream
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            warn!("Already playing");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let shared = Arc::clone(&self.shared);
        let ended_tx = self.ended_tx.clone();

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut state = shared.lock();

                    if !state.playing {
                        data.fill(0.0);
                        return;
                    }

                    for frame in data.chunks_mut(channels) {
                        let sample = state.timeline.pop_front().unwrap_or(0.0);
                        state.played += 1;
                        for slot in frame.iter_mut() {
                            *slot = sample;
                        }
                    }

                    // Report chunks whose region the playhead has passed
                    let played = state.played;
                    let mut i = 0;
                    while i < state.spans.len() {
                        if state.spans[i].end <= played {
                            let span = state.spans.swap_remove(i);
                            let _ = ended_tx.try_send(span.id);
                        } else {
                            i += 1;
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                PalaverError::AudioDeviceError(format!("Failed to build output stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            PalaverError::AudioDeviceError(format!("Failed to start output stream: {}", e))
        })?;

        self.shared.lock().playing = true;
        self.stream = Some(stream);

        info!("Started audio playback");
        Ok(())
    }

    /// Stop the output stream and drop any queued audio
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.playing = false;
            state.timeline.clear();
            state.spans.clear();
        }

        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped audio playback");
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sample-accurate reading of how much audio the device has consumed
#[derive(Clone)]
pub struct DeviceClock {
    shared: Arc<Mutex<TimelineState>>,
    sample_rate: u32,
}

impl OutputClock for DeviceClock {
    fn now(&self) -> f64 {
        self.shared.lock().played as f64 / self.sample_rate as f64
    }
}

/// Mixes scheduled chunks into the device timeline
#[derive(Clone)]
pub struct DeviceSink {
    shared: Arc<Mutex<TimelineState>>,
    sample_rate: u32,
}

impl PlaybackSink for DeviceSink {
    fn schedule(&mut self, id: SourceId, chunk: &PlaybackChunk, start_time: f64) -> Result<()> {
        let samples = resample_audio(&chunk.samples, chunk.sample_rate, self.sample_rate)?;

        let mut state = self.shared.lock();
        // Never schedule into the past relative to the playhead
        let start = ((start_time * self.sample_rate as f64).round() as u64).max(state.played);
        let end = start + samples.len() as u64;

        let needed = (end - state.played) as usize;
        if state.timeline.len() < needed {
            state.timeline.resize(needed, 0.0);
        }

        let offset = (start - state.played) as usize;
        for (i, &sample) in samples.iter().enumerate() {
            state.timeline[offset + i] += sample;
        }

        state.spans.push(Span { id, start, end });
        Ok(())
    }

    fn stop(&mut self, id: SourceId) {
        let mut state = self.shared.lock();
        let Some(pos) = state.spans.iter().position(|s| s.id == id) else {
            return;
        };
        let span = state.spans.swap_remove(pos);

        // Silence whatever the playhead has not reached yet
        let played = state.played;
        let from = span.start.max(played);
        for i in from..span.end {
            let idx = (i - played) as usize;
            if let Some(slot) = state.timeline.get_mut(idx) {
                *slot = 0.0;
            }
        }
    }
}
