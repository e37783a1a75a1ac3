//! # Endpoint events
//!
//! Everything the engine learns from the network, and every asynchronous
//! failure, reaches the owner as one [`EndpointEvent`] on a single stream.
//! Events are emitted only after the dialog table reflects them.
//!
//! | kind                          | emitted for                                         |
//! |-------------------------------|-----------------------------------------------------|
//! | `invalid_message`             | inbound message without Call-ID or CSeq number      |
//! | `dialog_offer`                | new INVITE/SUBSCRIBE without To tag                 |
//! | `in_dialog_request`           | request whose Call-ID belongs to a known dialog     |
//! | `request_for_unknown_dialog`  | INVITE/SUBSCRIBE with a To tag and no known dialog  |
//! | `out_of_dialog_request`       | any other inbound request                           |
//! | `response`                    | response to something this endpoint sent            |
//! | `error`                       | classification, callback or transport failure      |

pub mod event_hub;

pub use event_hub::{EventHub, EventReceiver};

use serde::Serialize;

use sipprobe_sip_core::SipMessage;

use crate::dialog::{DialogId, EndpointId};

/// Value of [`EndpointEvent::source`] for every event
pub const EVENT_SOURCE: &str = "sip_endpoint";

/// Where an `error` event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    /// Handling an inbound request failed
    Classification,
    /// Handling a response to one of our requests failed
    ResponseCallback,
    /// The transport reported a delivery failure
    Transport,
    /// The dialog's endpoint was destroyed while the dialog was live
    EndpointDestroyed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    InvalidMessage {
        msg: SipMessage,
        reason: String,
    },
    DialogOffer {
        dialog_id: DialogId,
        req: SipMessage,
    },
    InDialogRequest {
        dialog_id: DialogId,
        req: SipMessage,
    },
    RequestForUnknownDialog {
        req: SipMessage,
    },
    OutOfDialogRequest {
        req: SipMessage,
    },
    Response {
        dialog_id: Option<DialogId>,
        res: SipMessage,
    },
    Error {
        origin: ErrorOrigin,
        details: String,
        dialog_id: Option<DialogId>,
    },
}

impl EventKind {
    /// Snake-case kind name, as used in logs and serialized events
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::InvalidMessage { .. } => "invalid_message",
            EventKind::DialogOffer { .. } => "dialog_offer",
            EventKind::InDialogRequest { .. } => "in_dialog_request",
            EventKind::RequestForUnknownDialog { .. } => "request_for_unknown_dialog",
            EventKind::OutOfDialogRequest { .. } => "out_of_dialog_request",
            EventKind::Response { .. } => "response",
            EventKind::Error { .. } => "error",
        }
    }

    pub fn dialog_id(&self) -> Option<DialogId> {
        match self {
            EventKind::DialogOffer { dialog_id, .. } | EventKind::InDialogRequest { dialog_id, .. } => {
                Some(*dialog_id)
            }
            EventKind::Response { dialog_id, .. } | EventKind::Error { dialog_id, .. } => *dialog_id,
            _ => None,
        }
    }

    /// The SIP message carried by the event, if any
    pub fn message(&self) -> Option<&SipMessage> {
        match self {
            EventKind::InvalidMessage { msg, .. } => Some(msg),
            EventKind::DialogOffer { req, .. }
            | EventKind::InDialogRequest { req, .. }
            | EventKind::RequestForUnknownDialog { req }
            | EventKind::OutOfDialogRequest { req } => Some(req),
            EventKind::Response { res, .. } => Some(res),
            EventKind::Error { .. } => None,
        }
    }
}

/// One event on the engine's stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointEvent {
    source: &'static str,
    pub endpoint_id: EndpointId,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl EndpointEvent {
    pub fn new(endpoint_id: EndpointId, kind: EventKind) -> Self {
        Self {
            source: EVENT_SOURCE,
            endpoint_id,
            kind,
        }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn dialog_id(&self) -> Option<DialogId> {
        self.kind.dialog_id()
    }

    pub fn message(&self) -> Option<&SipMessage> {
        self.kind.message()
    }

    /// JSON rendering with `source`, `endpoint_id` and `event` at the top level
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
