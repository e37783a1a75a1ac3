//! Endpoints: one bound transport plus the identity it advertises
//!
//! Every message leaving an endpoint carries the endpoint's own Contact,
//! `scheme:user@bind_address:bind_port`, whatever the template or the
//! overrides said.

use serde::Serialize;
use tracing::trace;

use sipprobe_sip_core::{HeaderValue, NameAddr, SipMessage};

use crate::config::TransportKind;
use crate::dialog::EndpointId;
use crate::transport::{ResponseHandler, TransportError, TransportHandle};

/// Public view of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointInfo {
    pub id: EndpointId,
    pub bind_address: String,
    pub bind_port: u16,
    pub public_address: Option<String>,
    pub transport: TransportKind,
    /// Contact URI written into every outbound message
    pub contact: String,
}

pub(crate) struct EndpointRecord {
    pub(crate) info: EndpointInfo,
    transport: Box<dyn TransportHandle>,
}

impl EndpointRecord {
    pub(crate) fn new(
        id: EndpointId,
        transport: Box<dyn TransportHandle>,
        scheme: &str,
        contact_user: &str,
        public_address: Option<String>,
        kind: TransportKind,
    ) -> Self {
        let (bind_address, bind_port) = transport.local_addr();
        let contact = format!("{}:{}@{}:{}", scheme, contact_user, bind_address, bind_port);
        Self {
            info: EndpointInfo {
                id,
                bind_address,
                bind_port,
                public_address,
                transport: kind,
                contact,
            },
            transport,
        }
    }

    pub(crate) fn id(&self) -> EndpointId {
        self.info.id
    }

    pub(crate) fn contact(&self) -> &str {
        &self.info.contact
    }

    /// Hand `msg` to the transport with our Contact in place
    pub(crate) fn send(&self, mut msg: SipMessage, on_response: Option<ResponseHandler>) -> Result<(), TransportError> {
        msg.headers
            .set("contact", HeaderValue::Address(NameAddr::new(self.info.contact.clone())));
        trace!(endpoint = %self.info.id, start = ?msg.start_line, "endpoint send");
        self.transport.send(msg, on_response)
    }

    pub(crate) fn pending_responses(&self) -> usize {
        self.transport.pending_responses()
    }

    pub(crate) fn destroy(&self) {
        self.transport.destroy();
    }
}
