//! Channel bundle wiring one session's event loop

use crate::session::controller::SessionEvent;
use crate::session::transport::TransportEvent;
use crossbeam_channel::{bounded, Receiver, Sender};

/// Bounded channels connecting the microphone and the transport to the
/// controller's event loop, and the controller to its consumer
pub struct SessionChannels {
    /// Microphone frames (device -> controller)
    pub frames_tx: Sender<Vec<f32>>,
    pub frames_rx: Receiver<Vec<f32>>,

    /// Transport callbacks (transport -> controller)
    pub transport_tx: Sender<TransportEvent>,
    pub transport_rx: Receiver<TransportEvent>,

    /// Session events (controller -> consumer)
    pub event_tx: Sender<SessionEvent>,
    pub event_rx: Receiver<SessionEvent>,
}

impl SessionChannels {
    pub fn new(queue_size: usize) -> Self {
        let (frames_tx, frames_rx) = bounded(queue_size);
        let (transport_tx, transport_rx) = bounded(queue_size);
        let (event_tx, event_rx) = bounded(queue_size);

        Self {
            frames_tx,
            frames_rx,
            transport_tx,
            transport_rx,
            event_tx,
            event_rx,
        }
    }
}
