//! In-process echo transport for demos and integration tests
//!
//! Opens immediately and answers every captured packet by returning the same
//! audio as model speech, resampled to the synthesis rate. Lets the full
//! capture -> transport -> playback path run without network or credentials.

use crate::audio::pcm;
use crate::audio::resampler::resample_audio;
use crate::session::config::{INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};
use crate::session::transport::{
    InlineData, ModelTurn, Part, RealtimeInput, RealtimeTransport, ServerContent, ServerMessage,
    TransportEvent,
};
use crate::{PalaverError, Result};
use crossbeam_channel::Sender;
use tracing::debug;

/// Transport that echoes captured audio back as synthesized speech
#[derive(Default)]
pub struct EchoTransport {
    events: Option<Sender<TransportEvent>>,
    packets_echoed: usize,
}

impl EchoTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packets echoed back so far
    pub fn packets_echoed(&self) -> usize {
        self.packets_echoed
    }
}

impl RealtimeTransport for EchoTransport {
    fn connect(&mut self, setup: serde_json::Value, events: Sender<TransportEvent>) -> Result<()> {
        debug!(
            "Echo transport connected (voice {})",
            setup["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"]
        );

        events
            .try_send(TransportEvent::Opened)
            .map_err(|e| PalaverError::ConnectionError(format!("Event channel refused: {}", e)))?;
        self.events = Some(events);
        Ok(())
    }

    fn send_realtime_input(&mut self, input: &RealtimeInput) -> Result<()> {
        let Some(events) = &self.events else {
            return Err(PalaverError::ConnectionError("Not connected".into()));
        };

        let bytes = pcm::decode_transport(&input.media.data)?;
        let samples = pcm::pcm16_to_mono(&bytes, 1)?;
        let upsampled = resample_audio(&samples, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE)?;
        let payload = pcm::encode_transport(&pcm::float_to_pcm16(&upsampled));

        let message = ServerMessage {
            server_content: Some(ServerContent {
                model_turn: Some(ModelTurn {
                    parts: vec![Part {
                        inline_data: Some(InlineData {
                            data: payload,
                            mime_type: pcm::pcm_mime_type(OUTPUT_SAMPLE_RATE),
                        }),
                    }],
                }),
                ..Default::default()
            }),
        };

        // try_send: the controller both sends and drains on one thread, so a
        // full channel must drop the echo rather than deadlock the loop
        if events.try_send(TransportEvent::Message(message)).is_err() {
            debug!("Echo dropped: event channel full");
        } else {
            self.packets_echoed += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(events) = self.events.take() {
            let _ = events.try_send(TransportEvent::Closed);
            debug!("Echo transport closed after {} packets", self.packets_echoed);
        }
        Ok(())
    }
}
