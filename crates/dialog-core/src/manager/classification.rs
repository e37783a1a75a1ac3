//! Inbound classification
//!
//! Every message the transport hands to an endpoint becomes exactly one
//! event:
//!
//! ```text
//! response (no pending request)          → response
//! no Call-ID, or no CSeq number          → invalid_message
//! Call-ID correlated on this endpoint    → in_dialog_request
//! INVITE/SUBSCRIBE, To without tag       → dialog_offer  (new incoming dialog)
//! INVITE/SUBSCRIBE, To with tag          → request_for_unknown_dialog
//! anything else                          → out_of_dialog_request
//! ```
//!
//! A failure or panic while classifying is reported as an `error` event of
//! origin `classification`; the transport task keeps running.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, info, warn};

use sipprobe_sip_core::builder::generate_tag;
use sipprobe_sip_core::SipMessage;

use super::core::Engine;
use crate::dialog::{Dialog, EndpointId};
use crate::errors::{DialogError, DialogResult};
use crate::events::{ErrorOrigin, EventKind};

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

impl Engine {
    /// Entry point for the transport's `on_request` callback
    pub(crate) fn handle_inbound(&self, endpoint_id: EndpointId, msg: SipMessage) {
        if !self.inner.endpoints.contains_key(&endpoint_id) {
            debug!(endpoint = %endpoint_id, "dropping message for destroyed endpoint");
            return;
        }
        let details = match catch_unwind(AssertUnwindSafe(|| self.classify(endpoint_id, msg))) {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };
        warn!(endpoint = %endpoint_id, "classification failed: {}", details);
        self.emit(
            endpoint_id,
            EventKind::Error {
                origin: ErrorOrigin::Classification,
                details,
                dialog_id: None,
            },
        );
    }

    pub(crate) fn classify(&self, endpoint_id: EndpointId, msg: SipMessage) -> DialogResult<()> {
        if msg.is_response() {
            let dialog_id = msg
                .call_id()
                .and_then(|call_id| self.find_dialog(call_id, endpoint_id));
            debug!(endpoint = %endpoint_id, status = ?msg.status(), "unmatched response");
            self.emit(endpoint_id, EventKind::Response { dialog_id, res: msg });
            return Ok(());
        }

        let Some(call_id) = msg.call_id().map(str::to_string) else {
            return self.invalid(endpoint_id, msg, "missing Call-ID");
        };
        if msg.cseq().is_none() {
            return self.invalid(endpoint_id, msg, "missing or malformed CSeq");
        }

        if let Some(dialog_id) = self.find_dialog(&call_id, endpoint_id) {
            let handle = self.dialog_handle(dialog_id)?;
            let mut dialog = handle.lock();
            dialog.update_from_request(&msg);
            debug!(dialog = %dialog_id, method = ?msg.method(), "in-dialog request");
            self.emit(endpoint_id, EventKind::InDialogRequest { dialog_id, req: msg });
            return Ok(());
        }

        let method = msg
            .method()
            .ok_or_else(|| DialogError::protocol("request without method"))?;
        if !method.creates_dialog() {
            self.emit(endpoint_id, EventKind::OutOfDialogRequest { req: msg });
            return Ok(());
        }
        if msg.to_tag().is_some() {
            debug!(endpoint = %endpoint_id, call_id = %call_id, "request for unknown dialog");
            self.emit(endpoint_id, EventKind::RequestForUnknownDialog { req: msg });
            return Ok(());
        }

        let dialog = Dialog::incoming(endpoint_id, &msg, generate_tag())?;
        let dialog_id = self.register_dialog(dialog)?;
        info!(endpoint = %endpoint_id, dialog = %dialog_id, call_id = %call_id, "incoming dialog offered");
        self.emit(endpoint_id, EventKind::DialogOffer { dialog_id, req: msg });
        Ok(())
    }

    fn invalid(&self, endpoint_id: EndpointId, msg: SipMessage, reason: &str) -> DialogResult<()> {
        debug!(endpoint = %endpoint_id, reason, "invalid message");
        self.emit(
            endpoint_id,
            EventKind::InvalidMessage {
                msg,
                reason: reason.to_string(),
            },
        );
        Ok(())
    }
}
