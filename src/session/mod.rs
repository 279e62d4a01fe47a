pub mod channels;
pub mod config;
pub mod controller;
pub mod loopback;
pub mod transcript;
pub mod transport;

pub use channels::SessionChannels;
pub use config::SessionConfig;
pub use controller::{SessionController, SessionEvent, SessionHandle, SessionState};
pub use loopback::EchoTransport;
pub use transcript::{Speaker, Transcript, TranscriptFragment};
pub use transport::{
    MediaBlob, RealtimeInput, RealtimeTransport, ServerMessage, TransportEvent,
};
