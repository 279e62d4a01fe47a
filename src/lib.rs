pub mod audio;
pub mod session;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PalaverError {
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Malformed audio data: {0}")]
    MalformedAudioData(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for PalaverError {
    fn from(e: std::io::Error) -> Self {
        PalaverError::IOError(e.to_string())
    }
}

impl PalaverError {
    /// Check if this error is recoverable within the current session
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Terminal for this attempt; the user must restart manually
            PalaverError::PermissionDenied(_) => false,
            PalaverError::ConnectionError(_) => false,
            PalaverError::AudioDeviceError(_) => false,
            // A malformed payload is dropped; the session continues
            PalaverError::MalformedAudioData(_) => true,
            PalaverError::AudioProcessingError(_) => true,
            PalaverError::ConfigError(_) => false,
            PalaverError::ChannelError(_) => false,
            PalaverError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description for the status line
    pub fn user_message(&self) -> String {
        match self {
            PalaverError::PermissionDenied(_) => {
                "Microphone access denied. Please allow microphone use and try again.".to_string()
            }
            PalaverError::ConnectionError(_) => {
                "Failed to start voice session".to_string()
            }
            PalaverError::MalformedAudioData(_) => {
                "Received unplayable audio. Skipping.".to_string()
            }
            PalaverError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            PalaverError::AudioProcessingError(_) => {
                "Audio processing failed. Please try again.".to_string()
            }
            PalaverError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            PalaverError::ChannelError(_) => {
                "Internal communication error. Please restart the session.".to_string()
            }
            PalaverError::IOError(_) => {
                "File system error occurred.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PalaverError>;
