//! # Transport collaborator
//!
//! The engine never touches sockets. Each endpoint owns one
//! [`TransportHandle`] created by the engine's [`TransportFactory`]; the
//! handle owns all network I/O and completion:
//!
//! ```text
//!            send(msg, on_response)                    on_request(msg)
//!  Engine ─────────────────────────► TransportHandle ──────────────────► Engine
//!                                        │    ▲
//!                   adds top Via,        │    │  responses matched by
//!                   picks destination    ▼    │  top Via branch
//!                                       network
//! ```
//!
//! - requests get a fresh top Via with a new branch; responses to them are
//!   delivered to the `on_response` callback registered for that branch,
//!   zero or more times
//! - inbound requests, and responses matching no pending branch, go to the
//!   `on_request` callback given at creation
//! - failures to deliver are reported through `on_response` as a
//!   [`TransportError`]
//!
//! Callbacks always run on a transport task, never inside `send`.
//!
//! Two implementations ship with the crate: [`loopback::LoopbackNetwork`]
//! delivers between endpoints of the same process, [`udp::UdpTransportFactory`]
//! uses real UDP sockets.

pub mod loopback;
pub mod udp;

mod pending;

pub use loopback::LoopbackNetwork;
pub use udp::UdpTransportFactory;

pub(crate) use pending::{PendingResponses, INVITE_LINGER};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sipprobe_sip_core::types::uri::DEFAULT_SIP_PORT;
use sipprobe_sip_core::types::generate_branch;
use sipprobe_sip_core::{HeaderValue, SipMessage, SipUri, Via};

use crate::config::TransportKind;

/// Errors raised by transport collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("destination unreachable: {0}")]
    Unreachable(String),

    #[error("address already in use: {0}")]
    AddressInUse(String),

    #[error("no route for message: {0}")]
    NoRoute(String),

    #[error("unsupported transport: {0}")]
    Unsupported(String),

    #[error("transport must be created inside a tokio runtime")]
    NoRuntime,

    #[error("transport closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::AddrInUse => TransportError::AddressInUse(err.to_string()),
            _ => TransportError::Io(err.to_string()),
        }
    }
}

/// Called with every inbound request (and every unmatched response)
pub type RequestHandler = Arc<dyn Fn(SipMessage) + Send + Sync>;

/// Called with every response to one sent request, or with a delivery failure
pub type ResponseHandler = Arc<dyn Fn(Result<SipMessage, TransportError>) + Send + Sync>;

/// Where a transport binds and what it writes into Via
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportOptions {
    pub address: String,
    pub port: u16,
    /// Host written into Via sent-by, when different from `address`
    pub public_address: Option<String>,
    pub kind: TransportKind,
}

impl TransportOptions {
    /// Host used in Via sent-by
    pub fn sent_by_host(&self) -> &str {
        self.public_address.as_deref().unwrap_or(&self.address)
    }
}

/// Creates one transport per endpoint
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        options: &TransportOptions,
        on_request: RequestHandler,
    ) -> Result<Box<dyn TransportHandle>, TransportError>;
}

/// A live transport bound to one local address
pub trait TransportHandle: Send + Sync {
    /// Queue a message for delivery. Never blocks on I/O.
    fn send(&self, msg: SipMessage, on_response: Option<ResponseHandler>) -> Result<(), TransportError>;

    /// Address and port actually bound
    fn local_addr(&self) -> (String, u16);

    /// Requests still waiting for responses
    fn pending_responses(&self) -> usize;

    /// Stop receiving and drop pending callbacks
    fn destroy(&self);
}

/// Push a fresh top Via onto a request and return its branch
pub(crate) fn stamp_via(msg: &mut SipMessage, options: &TransportOptions, port: u16) -> String {
    let branch = generate_branch();
    let via = Via::new(options.kind.as_str(), options.sent_by_host(), Some(port))
        .with_branch(branch.clone())
        .with_rport();
    let mut vias = vec![HeaderValue::Via(via)];
    vias.extend(msg.headers.values("via").iter().cloned());
    msg.headers.set_list("via", vias);
    branch
}

fn uri_target(uri: &str) -> Result<(String, u16), TransportError> {
    let parsed = SipUri::parse(uri).map_err(|e| TransportError::NoRoute(e.to_string()))?;
    if parsed.host.is_empty() {
        return Err(TransportError::NoRoute(format!("no host in {}", uri)));
    }
    Ok(parsed.host_port())
}

/// Next hop of a request: the first Route, else the Request-URI
pub(crate) fn request_destination(msg: &SipMessage) -> Result<(String, u16), TransportError> {
    let route = msg
        .headers
        .values("route")
        .first()
        .map(|value| match value {
            HeaderValue::Address(addr) => addr.uri.clone(),
            other => other.to_string(),
        });
    match route.as_deref().or_else(|| msg.uri()) {
        Some(uri) => uri_target(uri),
        None => Err(TransportError::NoRoute("request without Request-URI".to_string())),
    }
}

/// Where a response goes: the top Via, honouring `received` and `rport`
pub(crate) fn response_destination(msg: &SipMessage) -> Result<(String, u16), TransportError> {
    msg.top_via()
        .map(|via| {
            let (host, port) = via.response_target();
            (host, if port == 0 { DEFAULT_SIP_PORT } else { port })
        })
        .ok_or_else(|| TransportError::NoRoute("response without Via".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sipprobe_sip_core::{Method, NameAddr};

    fn options() -> TransportOptions {
        TransportOptions {
            address: "127.0.0.1".to_string(),
            port: 5070,
            public_address: None,
            kind: TransportKind::Udp,
        }
    }

    #[test]
    fn test_stamp_via_prepends() {
        let mut msg = SipMessage::request(Method::Options, "sip:bob@127.0.0.1:5080")
            .with_header("Via", Via::new("UDP", "proxy", Some(5060)).with_branch("z9hG4bKp"));
        let branch = stamp_via(&mut msg, &options(), 5070);
        let vias = msg.headers.values("via");
        assert_eq!(vias.len(), 2);
        assert_eq!(msg.branch(), Some(branch.as_str()));
        assert_eq!(msg.top_via().map(|v| v.host.as_str()), Some("127.0.0.1"));
    }

    #[test]
    fn test_request_destination_prefers_route() {
        let msg = SipMessage::request(Method::Invite, "sip:bob@127.0.0.1:5080");
        assert_eq!(request_destination(&msg), Ok(("127.0.0.1".to_string(), 5080)));

        let routed = msg.with_header("Route", NameAddr::new("sip:10.0.0.9;lr"));
        assert_eq!(request_destination(&routed), Ok(("10.0.0.9".to_string(), 5060)));
    }

    #[test]
    fn test_response_destination_uses_via() {
        let res = SipMessage::response(200, "OK")
            .with_header("Via", Via::new("UDP", "127.0.0.1", Some(5070)).with_branch("z9hG4bKx"));
        assert_eq!(response_destination(&res), Ok(("127.0.0.1".to_string(), 5070)));
        assert!(response_destination(&SipMessage::response(200, "OK")).is_err());
    }
}
