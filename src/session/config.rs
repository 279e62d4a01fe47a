//! Session configuration

use crate::{PalaverError, Result};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Sample rate the transport accepts for captured audio
pub const INPUT_SAMPLE_RATE: u32 = 16000;

/// Sample rate the service synthesizes speech at
pub const OUTPUT_SAMPLE_RATE: u32 = 24000;

/// Configuration for one voice session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Prebuilt synthetic voice name
    pub voice: String,

    /// System instruction sent with the connection setup
    pub system_instruction: String,

    /// Request live transcription of the user's speech
    pub input_transcription: bool,

    /// Request live transcription of the model's speech
    pub output_transcription: bool,

    /// Rate captured audio is sent at
    pub input_sample_rate: u32,

    /// Rate synthesized audio arrives at
    pub output_sample_rate: u32,

    /// Optional WAV recording of the model's speech, written on teardown
    pub record_path: Option<PathBuf>,

    /// Bound for the session's internal channels
    pub queue_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            voice: "Kore".to_string(),
            system_instruction: String::new(),
            input_transcription: true,
            output_transcription: true,
            input_sample_rate: INPUT_SAMPLE_RATE,
            output_sample_rate: OUTPUT_SAMPLE_RATE,
            record_path: None,
            queue_size: 256,
        }
    }
}

impl SessionConfig {
    /// Create a config with a system instruction
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            ..Default::default()
        }
    }

    /// Set the synthetic voice
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Record the model's speech to a WAV file on teardown
    pub fn with_record_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.record_path = Some(path.into());
        self
    }

    /// Disable transcription of the user's speech
    pub fn without_input_transcription(mut self) -> Self {
        self.input_transcription = false;
        self
    }

    /// Disable transcription of the model's speech
    pub fn without_output_transcription(mut self) -> Self {
        self.output_transcription = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.input_sample_rate == 0 || self.output_sample_rate == 0 {
            return Err(PalaverError::ConfigError(
                "Sample rates must be greater than 0".into(),
            ));
        }
        if self.queue_size == 0 {
            return Err(PalaverError::ConfigError(
                "Queue size must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Build the connection setup payload
    pub fn setup_payload(&self) -> Value {
        let mut payload = json!({
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.voice } }
            },
            "systemInstruction":
                format!("{}\nRespond concisely. This is a voice conversation.",
                        self.system_instruction),
        });

        if self.input_transcription {
            payload["inputAudioTranscription"] = json!({});
        }
        if self.output_transcription {
            payload["outputAudioTranscription"] = json!({});
        }

        payload
    }
}
