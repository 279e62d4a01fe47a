//! Wire types and the transport seam for the streaming session
//!
//! The remote service is an opaque collaborator; this module pins down only
//! the boundary the core touches: the realtime-input envelope going out, the
//! server content coming back, and the callback-style events a transport
//! implementation delivers over a channel.

use crate::Result;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// Transport-encoded media payload with a MIME-style tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    /// Base64 text of the raw payload
    pub data: String,

    /// e.g. `audio/pcm;rate=16000`
    pub mime_type: String,
}

/// Client -> server realtime input envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeInput {
    pub media: MediaBlob,
}

/// A transcription fragment for one direction of the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionFragment {
    pub text: String,
}

/// Inline binary content inside a model turn part
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub data: String,
    pub mime_type: String,
}

/// One part of a model turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// The model's streamed turn content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Server content carried by one message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_transcription: Option<TranscriptionFragment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_transcription: Option<TranscriptionFragment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<ModelTurn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
}

/// One server -> client message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_content: Option<ServerContent>,
}

/// Callback events a transport delivers on its event channel
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The connection handshake completed
    Opened,

    /// An inbound server message
    Message(ServerMessage),

    /// The transport failed; terminal for the session
    Error(String),

    /// The remote side closed the connection
    Closed,
}

/// Bidirectional streaming connection to the voice service.
///
/// `connect` returns once the attempt is underway; the handshake outcome
/// arrives as `Opened` or `Error` on the event channel. `close` must be
/// idempotent — an attempt that resolves after a close is closed again
/// immediately by the caller.
pub trait RealtimeTransport {
    /// Open the connection with the session setup payload
    fn connect(&mut self, setup: serde_json::Value, events: Sender<TransportEvent>) -> Result<()>;

    /// Stream one realtime input envelope to the service
    fn send_realtime_input(&mut self, input: &RealtimeInput) -> Result<()>;

    /// Close the connection; safe to call repeatedly and in any state
    fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_input_wire_format() {
        let input = RealtimeInput {
            media: MediaBlob {
                data: "AAAA".to_string(),
                mime_type: "audio/pcm;rate=16000".to_string(),
            },
        };

        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["media"]["data"], "AAAA");
        assert_eq!(json["media"]["mimeType"], "audio/pcm;rate=16000");
    }

    #[test]
    fn test_server_message_audio_payload() {
        let raw = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [{"inlineData": {"data": "UE9N", "mimeType": "audio/pcm;rate=24000"}}]
                }
            }
        }"#;

        let message: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = message.server_content.unwrap();
        let part = &content.model_turn.unwrap().parts[0];
        let inline = part.inline_data.as_ref().unwrap();
        assert_eq!(inline.data, "UE9N");
        assert_eq!(inline.mime_type, "audio/pcm;rate=24000");
    }

    #[test]
    fn test_server_message_transcription_and_interrupt() {
        let raw = r#"{
            "serverContent": {
                "outputTranscription": {"text": "hello"},
                "inputTranscription": {"text": "hi"},
                "interrupted": true
            }
        }"#;

        let message: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = message.server_content.unwrap();
        assert_eq!(content.output_transcription.unwrap().text, "hello");
        assert_eq!(content.input_transcription.unwrap().text, "hi");
        assert_eq!(content.interrupted, Some(true));
    }

    #[test]
    fn test_empty_message_tolerated() {
        let message: ServerMessage = serde_json::from_str("{}").unwrap();
        assert!(message.server_content.is_none());

        let message: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {}}"#).unwrap();
        let content = message.server_content.unwrap();
        assert!(content.model_turn.is_none());
        assert!(content.interrupted.is_none());
    }
}
