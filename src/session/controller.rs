//! Session controller: connection lifecycle, dispatch, and teardown
//!
//! Owns everything a voice session touches — the transport, the capture
//! device and pipeline, the playback scheduler, and the transcript — and
//! runs them from a single cooperative event loop. Device callbacks and the
//! transport deliver into bounded channels; all state mutation happens in
//! `pump`/`run` on one thread.

use crate::audio::capture::{CaptureDevice, CapturePipeline};
use crate::audio::pcm;
use crate::audio::playback::{OutputClock, PlaybackScheduler, PlaybackSink, SourceId};
use crate::audio::wav;
use crate::session::channels::SessionChannels;
use crate::session::config::SessionConfig;
use crate::session::transcript::{Speaker, Transcript};
use crate::session::transport::{
    RealtimeInput, RealtimeTransport, ServerMessage, TransportEvent,
};
use crate::Result;
use crossbeam_channel::{Receiver, Sender};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
    Error,
}

/// Events emitted to the session's consumer
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Human-readable status line
    Status(String),

    /// The session reached `Open`; audio is flowing
    Active,

    /// A transcription fragment was appended
    TranscriptFragment { speaker: Speaker, text: String },

    /// Terminal failure, already rendered for the status line
    Error(String),

    /// The session ended
    Closed,
}

/// Consumer-side handle for one session
pub struct SessionHandle {
    event_rx: Receiver<SessionEvent>,
}

impl SessionHandle {
    /// Try to receive an event without blocking
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Get a receiver for session events
    pub fn event_receiver(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }
}

/// Controller for one voice session
pub struct SessionController {
    id: Uuid,
    config: SessionConfig,
    state: SessionState,
    closed: bool,

    transport: Box<dyn RealtimeTransport>,
    capture_device: Box<dyn CaptureDevice>,
    capture: CapturePipeline,
    scheduler: PlaybackScheduler,
    transcript: Transcript,

    /// Model speech accumulated for the optional WAV recording
    recorded: Vec<f32>,

    frames_tx: Sender<Vec<f32>>,
    frames_rx: Receiver<Vec<f32>>,
    transport_tx: Sender<TransportEvent>,
    transport_rx: Receiver<TransportEvent>,
    completions_rx: Receiver<SourceId>,
    event_tx: Sender<SessionEvent>,
}

impl SessionController {
    /// Create a controller over the given transport, capture device, and
    /// playback clock/sink. `completions` delivers ids of chunks the output
    /// device finished playing naturally.
    pub fn new(
        config: SessionConfig,
        transport: Box<dyn RealtimeTransport>,
        capture_device: Box<dyn CaptureDevice>,
        clock: Box<dyn OutputClock>,
        sink: Box<dyn PlaybackSink>,
        completions: Receiver<SourceId>,
    ) -> Result<(Self, SessionHandle)> {
        config.validate()?;

        let channels = SessionChannels::new(config.queue_size);
        let capture =
            CapturePipeline::new(capture_device.sample_rate(), config.input_sample_rate)?;
        let scheduler = PlaybackScheduler::new(clock, sink);

        let handle = SessionHandle {
            event_rx: channels.event_rx.clone(),
        };

        let controller = Self {
            id: Uuid::new_v4(),
            config,
            state: SessionState::Idle,
            closed: false,
            transport,
            capture_device,
            capture,
            scheduler,
            transcript: Transcript::new(),
            recorded: Vec::new(),
            frames_tx: channels.frames_tx,
            frames_rx: channels.frames_rx,
            transport_tx: channels.transport_tx,
            transport_rx: channels.transport_rx,
            completions_rx: completions,
            event_tx: channels.event_tx,
        };

        Ok((controller, handle))
    }

    /// Start the session: request the microphone, then open the connection.
    ///
    /// Both failures are terminal for this attempt and surfaced as status
    /// events; there is no automatic retry.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(crate::PalaverError::ConfigError(
                "Session already started".into(),
            ));
        }

        self.set_status("Initializing...");
        self.state = SessionState::Connecting;
        info!("Session {} connecting", self.id);

        if let Err(e) = self.capture_device.start(self.frames_tx.clone()) {
            error!("Microphone unavailable: {}", e);
            self.state = SessionState::Error;
            self.emit(SessionEvent::Error(e.user_message()));
            return Err(e);
        }

        if let Err(e) = self
            .transport
            .connect(self.config.setup_payload(), self.transport_tx.clone())
        {
            error!("Connection failed: {}", e);
            self.capture_device.stop();
            self.state = SessionState::Error;
            self.emit(SessionEvent::Error(e.user_message()));
            return Err(e);
        }

        Ok(())
    }

    /// Drain all pending frames, transport events, and playback completions.
    ///
    /// Returns false once the session is terminal. Deterministic: processes
    /// exactly what has arrived, in channel order per source.
    pub fn pump(&mut self) -> bool {
        while let Ok(event) = self.transport_rx.try_recv() {
            self.handle_transport_event(event);
        }

        while let Ok(id) = self.completions_rx.try_recv() {
            self.scheduler.finished(id);
        }

        while let Ok(frame) = self.frames_rx.try_recv() {
            self.handle_frame(&frame);
        }

        !self.is_terminal()
    }

    /// Run the event loop until the session is terminal, then tear down
    pub fn run(&mut self) {
        while self.pump() {
            std::thread::sleep(Duration::from_millis(5));
        }
        self.close();
    }

    /// Unconditional teardown; safe in every state and idempotent.
    ///
    /// Stops the capture device, closes the transport (an in-flight connect
    /// resolving later is closed again on arrival), force-stops all
    /// scheduled audio, and flushes the optional WAV recording.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        info!("Closing session {}", self.id);

        self.capture_device.stop();
        if let Err(e) = self.transport.close() {
            warn!("Transport close failed: {}", e);
        }
        self.scheduler.stop_all();

        if let Some(path) = &self.config.record_path {
            if !self.recorded.is_empty() {
                if let Err(e) = wav::write_wav(path, &self.recorded, self.config.output_sample_rate)
                {
                    warn!("Failed to write session recording: {}", e);
                }
            }
        }

        let already_ended = matches!(self.state, SessionState::Closed | SessionState::Error);
        if self.state != SessionState::Error {
            self.state = SessionState::Closed;
        }
        if !already_ended {
            self.emit(SessionEvent::Closed);
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.closed {
            // A handshake resolving after close must not leave the
            // connection open
            if matches!(event, TransportEvent::Opened) {
                let _ = self.transport.close();
            }
            return;
        }

        match event {
            TransportEvent::Opened => {
                if self.state == SessionState::Connecting {
                    self.state = SessionState::Open;
                    info!("Session {} open", self.id);
                    self.emit(SessionEvent::Active);
                    self.set_status("Listening...");
                } else {
                    debug!("Ignoring Opened in state {:?}", self.state);
                }
            }
            TransportEvent::Message(message) => self.dispatch_message(message),
            TransportEvent::Error(e) => {
                error!("Session {} transport error: {}", self.id, e);
                self.state = SessionState::Error;
                self.set_status("Error occurred");
                self.emit(SessionEvent::Error(e));
            }
            TransportEvent::Closed => {
                info!("Session {} closed by remote", self.id);
                self.state = SessionState::Closed;
                self.set_status("Connection closed");
                self.emit(SessionEvent::Closed);
            }
        }
    }

    fn dispatch_message(&mut self, message: ServerMessage) {
        let Some(content) = message.server_content else {
            return;
        };

        if let Some(fragment) = content.input_transcription {
            self.transcript.append(Speaker::User, &fragment.text);
            self.emit(SessionEvent::TranscriptFragment {
                speaker: Speaker::User,
                text: fragment.text,
            });
        }

        if let Some(fragment) = content.output_transcription {
            self.transcript.append(Speaker::Model, &fragment.text);
            self.emit(SessionEvent::TranscriptFragment {
                speaker: Speaker::Model,
                text: fragment.text,
            });
        }

        if let Some(turn) = content.model_turn {
            if let Some(inline) = turn.parts.first().and_then(|p| p.inline_data.as_ref()) {
                self.enqueue_audio(&inline.data);
            }
        }

        if content.interrupted == Some(true) {
            debug!("Barge-in: discarding queued playback");
            self.scheduler.interrupt();
        }
    }

    /// Queue one audio payload for playback. Malformed payloads are dropped
    /// with a warning; remote framing is outside local control and must not
    /// take the session down.
    fn enqueue_audio(&mut self, data: &str) {
        let bytes = match pcm::decode_transport(data) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Dropping audio payload: {}", e);
                return;
            }
        };

        if self.config.record_path.is_some() {
            if let Ok(samples) = pcm::pcm16_to_mono(&bytes, 1) {
                self.recorded.extend_from_slice(&samples);
            }
        }

        if let Err(e) = self
            .scheduler
            .enqueue(&bytes, self.config.output_sample_rate, 1)
        {
            warn!("Dropping audio payload: {}", e);
        }
    }

    fn handle_frame(&mut self, frame: &[f32]) {
        if self.state != SessionState::Open {
            return;
        }

        match self.capture.encode_frame(frame) {
            Ok(media) => {
                if let Err(e) = self.transport.send_realtime_input(&RealtimeInput { media }) {
                    warn!("Failed to send capture frame: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode capture frame: {}", e),
        }
    }

    fn set_status(&self, status: &str) {
        self.emit(SessionEvent::Status(status.to_string()));
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            debug!("Dropped session event: {}", e);
        }
    }

    fn is_terminal(&self) -> bool {
        self.closed || matches!(self.state, SessionState::Closed | SessionState::Error)
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The running transcript
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Number of chunks currently scheduled or playing
    pub fn active_playback(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.close();
    }
}
