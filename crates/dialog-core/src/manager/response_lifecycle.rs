//! Response lifecycle
//!
//! Every request the engine sends registers a response callback with the
//! transport. The callback runs on a transport task:
//!
//! ```text
//! Err(transport)  → error event (origin transport)
//! Ok(response)    → update dialog state → response event
//! panic           → error event (origin response_callback)
//! ```
//!
//! The dialog is updated before the `response` event is emitted, so an
//! owner reacting to a 2xx already sees the answered dialog.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, warn};

use sipprobe_sip_core::SipMessage;

use super::classification::panic_message;
use super::core::Engine;
use crate::dialog::{DialogId, EndpointId};
use crate::events::{ErrorOrigin, EventKind};
use crate::transport::{ResponseHandler, TransportError};

impl Engine {
    pub(crate) fn response_handler(&self, endpoint_id: EndpointId, dialog_id: Option<DialogId>) -> ResponseHandler {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |result| {
            if let Some(engine) = Engine::from_weak(&weak) {
                engine.handle_response(endpoint_id, dialog_id, result);
            }
        })
    }

    fn handle_response(
        &self,
        endpoint_id: EndpointId,
        dialog_id: Option<DialogId>,
        result: Result<SipMessage, TransportError>,
    ) {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(endpoint = %endpoint_id, dialog = ?dialog_id, "transport failure: {}", e);
                self.emit(
                    endpoint_id,
                    EventKind::Error {
                        origin: ErrorOrigin::Transport,
                        details: e.to_string(),
                        dialog_id,
                    },
                );
                return;
            }
        };

        match catch_unwind(AssertUnwindSafe(|| self.apply_response(dialog_id, &response))) {
            Ok(()) => self.emit(
                endpoint_id,
                EventKind::Response {
                    dialog_id,
                    res: response,
                },
            ),
            Err(payload) => {
                let details = panic_message(payload.as_ref());
                warn!(endpoint = %endpoint_id, dialog = ?dialog_id, "response handling failed: {}", details);
                self.emit(
                    endpoint_id,
                    EventKind::Error {
                        origin: ErrorOrigin::ResponseCallback,
                        details,
                        dialog_id,
                    },
                );
            }
        }
    }

    fn apply_response(&self, dialog_id: Option<DialogId>, response: &SipMessage) {
        let Some(dialog_id) = dialog_id else {
            return;
        };
        let Ok(handle) = self.dialog_handle(dialog_id) else {
            debug!(dialog = %dialog_id, "response for retired dialog");
            return;
        };
        let mut dialog = handle.lock();
        if dialog.update_from_response(response) {
            info!(
                dialog = %dialog_id,
                remote_target = ?dialog.remote_target,
                routes = dialog.route_set.len(),
                "dialog answered"
            );
        }
    }
}
