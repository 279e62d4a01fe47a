//! Playback scheduling for streamed synthesized speech
//!
//! Inbound PCM payloads arrive as discrete network chunks; this module turns
//! them into gapless output by queuing each chunk immediately after the
//! previous one on a monotonic device clock. A remote interruption signal
//! (barge-in) force-stops everything queued and resets the schedule.

use crate::audio::pcm;
use crate::Result;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Identifier for one scheduled chunk
pub type SourceId = u64;

/// Monotonic reading of the output device's current playback time, in seconds
pub trait OutputClock {
    fn now(&self) -> f64;
}

/// Output seam accepting buffers with a start time
pub trait PlaybackSink {
    /// Queue a chunk to begin playing at `start_time` on the device clock
    fn schedule(&mut self, id: SourceId, chunk: &PlaybackChunk, start_time: f64) -> Result<()>;

    /// Force-stop a chunk, silencing any unplayed remainder immediately
    fn stop(&mut self, id: SourceId);
}

/// A decoded audio buffer ready for output
#[derive(Debug, Clone)]
pub struct PlaybackChunk {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate of the chunk
    pub sample_rate: u32,
}

impl PlaybackChunk {
    /// Duration of this chunk in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Schedules decoded chunks back-to-back against the output clock.
///
/// Owns the scheduling clock (`next_start_time`) and the set of active
/// sources for one session; both are torn down with the scheduler.
pub struct PlaybackScheduler {
    clock: Box<dyn OutputClock>,
    sink: Box<dyn PlaybackSink>,
    next_start_time: f64,
    active: HashSet<SourceId>,
    next_id: SourceId,
}

impl PlaybackScheduler {
    pub fn new(clock: Box<dyn OutputClock>, sink: Box<dyn PlaybackSink>) -> Self {
        Self {
            clock,
            sink,
            next_start_time: 0.0,
            active: HashSet::new(),
            next_id: 0,
        }
    }

    /// Decode a PCM payload and queue it directly after the current schedule.
    ///
    /// The start time never lands in the past: if the device clock has run
    /// past the previously computed end time (a long gap between chunks),
    /// the schedule catches up to the clock first.
    pub fn enqueue(&mut self, bytes: &[u8], sample_rate: u32, channels: usize) -> Result<SourceId> {
        let samples = pcm::pcm16_to_mono(bytes, channels)?;
        let chunk = PlaybackChunk {
            samples,
            sample_rate,
        };
        let duration = chunk.duration_secs();

        self.next_start_time = self.next_start_time.max(self.clock.now());
        let start_time = self.next_start_time;

        let id = self.next_id;
        self.next_id += 1;

        // Registered before it starts, so a stop signal can always reach it
        self.active.insert(id);
        if let Err(e) = self.sink.schedule(id, &chunk, start_time) {
            self.active.remove(&id);
            return Err(e);
        }
        self.next_start_time = start_time + duration;

        trace!(
            "Scheduled chunk {} at {:.3}s ({:.3}s long, {} queued)",
            id,
            start_time,
            duration,
            self.active.len()
        );

        Ok(id)
    }

    /// Completion callback: a chunk finished playing naturally.
    ///
    /// Removing an id that an interruption already cleared is a no-op.
    pub fn finished(&mut self, id: SourceId) {
        if !self.active.remove(&id) {
            trace!("Completion for chunk {} already removed", id);
        }
    }

    /// Barge-in: force-stop everything queued or playing, discard the
    /// backlog, and reset the schedule to zero. The next chunk re-anchors
    /// on the device's current time.
    pub fn interrupt(&mut self) {
        let stopped = self.active.len();
        for id in self.active.drain() {
            self.sink.stop(id);
        }
        self.next_start_time = 0.0;

        if stopped > 0 {
            debug!("Interrupted playback, stopped {} chunk(s)", stopped);
        }
    }

    /// Teardown: force-stop everything without resetting the schedule
    pub fn stop_all(&mut self) {
        for id in self.active.drain() {
            self.sink.stop(id);
        }
    }

    /// Number of chunks currently scheduled or playing
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Device-clock time the current schedule runs until
    pub fn scheduled_until(&self) -> f64 {
        self.next_start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::float_to_pcm16;
    use crate::PalaverError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct TestClock(Rc<RefCell<f64>>);

    impl TestClock {
        fn new() -> Self {
            TestClock(Rc::new(RefCell::new(0.0)))
        }

        fn advance_to(&self, t: f64) {
            *self.0.borrow_mut() = t;
        }
    }

    impl OutputClock for TestClock {
        fn now(&self) -> f64 {
            *self.0.borrow()
        }
    }

    #[derive(Clone, Default)]
    struct TestSink {
        scheduled: Rc<RefCell<Vec<(SourceId, f64, f64)>>>,
        stopped: Rc<RefCell<Vec<SourceId>>>,
    }

    impl PlaybackSink for TestSink {
        fn schedule(&mut self, id: SourceId, chunk: &PlaybackChunk, start_time: f64) -> Result<()> {
            self.scheduled
                .borrow_mut()
                .push((id, start_time, chunk.duration_secs()));
            Ok(())
        }

        fn stop(&mut self, id: SourceId) {
            self.stopped.borrow_mut().push(id);
        }
    }

    fn pcm_chunk(duration_secs: f64, sample_rate: u32) -> Vec<u8> {
        let samples = vec![0.1f32; (duration_secs * sample_rate as f64).round() as usize];
        float_to_pcm16(&samples)
    }

    fn scheduler_with(clock: &TestClock, sink: &TestSink) -> PlaybackScheduler {
        PlaybackScheduler::new(Box::new(clock.clone()), Box::new(sink.clone()))
    }

    #[test]
    fn test_back_to_back_scheduling() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        scheduler.enqueue(&pcm_chunk(0.5, 24000), 24000, 1).unwrap();
        scheduler.enqueue(&pcm_chunk(0.3, 24000), 24000, 1).unwrap();
        scheduler.enqueue(&pcm_chunk(0.2, 24000), 24000, 1).unwrap();

        let scheduled = sink.scheduled.borrow();
        assert_eq!(scheduled.len(), 3);
        assert!((scheduled[0].1 - 0.0).abs() < 1e-9);
        assert!((scheduled[1].1 - 0.5).abs() < 1e-9);
        assert!((scheduled[2].1 - 0.8).abs() < 1e-9);
        assert!((scheduler.scheduled_until() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clock_catch_up() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        scheduler.enqueue(&pcm_chunk(0.5, 24000), 24000, 1).unwrap();

        // Device clock runs past the computed end of the first chunk
        clock.advance_to(2.0);
        scheduler.enqueue(&pcm_chunk(0.3, 24000), 24000, 1).unwrap();

        let scheduled = sink.scheduled.borrow();
        assert!((scheduled[1].1 - 2.0).abs() < 1e-9);
        assert!((scheduler.scheduled_until() - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_interrupt_stops_and_resets() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        let a = scheduler.enqueue(&pcm_chunk(0.5, 24000), 24000, 1).unwrap();
        let b = scheduler.enqueue(&pcm_chunk(0.5, 24000), 24000, 1).unwrap();

        scheduler.interrupt();

        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(scheduler.scheduled_until(), 0.0);
        let mut stopped = sink.stopped.borrow().clone();
        stopped.sort_unstable();
        assert_eq!(stopped, vec![a, b]);
    }

    #[test]
    fn test_chunk_after_interrupt_anchors_on_clock() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        scheduler.enqueue(&pcm_chunk(1.0, 24000), 24000, 1).unwrap();
        clock.advance_to(0.4);
        scheduler.interrupt();

        scheduler.enqueue(&pcm_chunk(0.2, 24000), 24000, 1).unwrap();
        let scheduled = sink.scheduled.borrow();
        // Restarts relative to the device's current time, not zero absolute
        assert!((scheduled[1].1 - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_completion_is_idempotent_against_interrupt() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        let id = scheduler.enqueue(&pcm_chunk(0.1, 24000), 24000, 1).unwrap();
        scheduler.interrupt();

        // The late completion callback must be a no-op
        scheduler.finished(id);
        scheduler.finished(id);
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(sink.stopped.borrow().len(), 1);
    }

    #[test]
    fn test_natural_completion_removes_once() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        let id = scheduler.enqueue(&pcm_chunk(0.1, 24000), 24000, 1).unwrap();
        assert_eq!(scheduler.active_count(), 1);

        scheduler.finished(id);
        assert_eq!(scheduler.active_count(), 0);

        // Nothing was force-stopped
        scheduler.interrupt();
        assert!(sink.stopped.borrow().is_empty());
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        let result = scheduler.enqueue(&[0u8, 1, 2], 24000, 1);
        assert!(matches!(result, Err(PalaverError::MalformedAudioData(_))));
        assert_eq!(scheduler.active_count(), 0);
        assert!(sink.scheduled.borrow().is_empty());
    }

    #[test]
    fn test_stop_all_keeps_clock() {
        let clock = TestClock::new();
        let sink = TestSink::default();
        let mut scheduler = scheduler_with(&clock, &sink);

        scheduler.enqueue(&pcm_chunk(0.5, 24000), 24000, 1).unwrap();
        scheduler.stop_all();

        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(sink.stopped.borrow().len(), 1);
        assert!((scheduler.scheduled_until() - 0.5).abs() < 1e-9);
    }
}
