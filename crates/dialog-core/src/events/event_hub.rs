//! Event delivery to the engine owner
//!
//! A single unbounded channel carries every [`EndpointEvent`]; emitting
//! never blocks, so events can be raised from transport tasks and from
//! inside dialog critical sections.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{EndpointEvent, EventKind};
use crate::dialog::EndpointId;

/// Receiving half of the engine's event stream
pub type EventReceiver = mpsc::UnboundedReceiver<EndpointEvent>;

#[derive(Debug, Clone)]
pub struct EventHub {
    tx: mpsc::UnboundedSender<EndpointEvent>,
}

impl EventHub {
    pub fn new() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, endpoint_id: EndpointId, kind: EventKind) {
        let event = EndpointEvent::new(endpoint_id, kind);
        trace!(endpoint = %endpoint_id, event = event.name(), dialog = ?event.dialog_id(), "emitting event");
        if self.tx.send(event).is_err() {
            debug!(endpoint = %endpoint_id, "event receiver dropped");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
