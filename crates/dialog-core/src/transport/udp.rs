//! UDP transport
//!
//! One socket per endpoint, shared by a receive loop and by send tasks.
//! Inbound requests get `received`/`rport` stamped on their top Via
//! (RFC 3261 Section 18.2.1, RFC 3581) so replies reach the real source.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use sipprobe_sip_core::{HeaderValue, SipMessage};

use super::{
    request_destination, response_destination, stamp_via, PendingResponses, RequestHandler,
    ResponseHandler, TransportError, TransportFactory, TransportHandle, TransportOptions,
    INVITE_LINGER,
};
use crate::config::TransportKind;

/// Largest datagram accepted
const MAX_DATAGRAM: usize = 65_535;

/// Creates UDP sockets bound to the endpoint's address
#[derive(Debug, Clone, Copy)]
pub struct UdpTransportFactory {
    invite_linger: Duration,
}

impl Default for UdpTransportFactory {
    fn default() -> Self {
        Self {
            invite_linger: INVITE_LINGER,
        }
    }
}

impl UdpTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep INVITE response callbacks for `linger` after the first final response
    pub fn with_invite_linger(mut self, linger: Duration) -> Self {
        self.invite_linger = linger;
        self
    }
}

impl TransportFactory for UdpTransportFactory {
    fn create(
        &self,
        options: &TransportOptions,
        on_request: RequestHandler,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        if options.kind != TransportKind::Udp {
            return Err(TransportError::Unsupported(options.kind.as_str().to_string()));
        }
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        let std_socket = std::net::UdpSocket::bind((options.address.as_str(), options.port))?;
        std_socket.set_nonblocking(true)?;
        let socket = {
            let _guard = runtime.enter();
            UdpSocket::from_std(std_socket)?
        };
        let local = socket.local_addr()?;
        info!("SIP UDP transport bound to {}", local);

        let mut options = options.clone();
        options.port = local.port();
        let socket = Arc::new(socket);
        let pending = Arc::new(PendingResponses::with_linger(self.invite_linger));
        let task = runtime.spawn(receive_loop(socket.clone(), on_request, pending.clone()));

        Ok(Box::new(UdpHandle {
            socket,
            options,
            local,
            pending,
            task,
            runtime,
            closed: AtomicBool::new(false),
        }))
    }
}

/// Record the observed source on the top Via of an inbound request
fn mark_received(msg: &mut SipMessage, src: SocketAddr) {
    let Some(HeaderValue::Via(via)) = msg
        .headers
        .get_mut("via")
        .and_then(|entry| entry.values_mut().first_mut())
    else {
        return;
    };
    let source_ip = src.ip().to_string();
    if via.host != source_ip {
        via.params.set("received", Some(source_ip));
    }
    if via.params.contains("rport") {
        via.params.set("rport", Some(src.port().to_string()));
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, on_request: RequestHandler, pending: Arc<PendingResponses>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => continue,
            Err(e) => {
                error!("Error receiving UDP packet: {}", e);
                break;
            }
        };
        let Ok(text) = std::str::from_utf8(&buf[..len]) else {
            warn!(%src, "dropping non UTF-8 datagram");
            continue;
        };
        let mut msg = match SipMessage::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%src, "Error parsing SIP message: {}", e);
                continue;
            }
        };
        trace!(%src, len, "received SIP message");
        if msg.is_response() {
            if let Some(unmatched) = pending.dispatch(msg) {
                on_request(unmatched);
            }
        } else {
            mark_received(&mut msg, src);
            on_request(msg);
        }
    }
    info!("UDP receive loop terminated");
}

async fn send_datagram(socket: &UdpSocket, host: &str, port: u16, wire: &[u8]) -> std::io::Result<usize> {
    let target = tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no address"))?;
    socket.send_to(wire, target).await
}

struct UdpHandle {
    socket: Arc<UdpSocket>,
    options: TransportOptions,
    local: SocketAddr,
    pending: Arc<PendingResponses>,
    task: JoinHandle<()>,
    runtime: Handle,
    closed: AtomicBool,
}

impl TransportHandle for UdpHandle {
    fn send(&self, mut msg: SipMessage, on_response: Option<ResponseHandler>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let (host, port, branch) = if msg.is_request() {
            let branch = stamp_via(&mut msg, &self.options, self.local.port());
            let (host, port) = request_destination(&msg)?;
            if let Some(handler) = on_response {
                self.pending.register(branch.clone(), handler);
            }
            (host, port, Some(branch))
        } else {
            let (host, port) = response_destination(&msg)?;
            (host, port, None)
        };

        let wire = msg.to_wire();
        debug!("Sending {} byte message to {}:{}", wire.len(), host, port);
        let socket = self.socket.clone();
        let pending = self.pending.clone();
        self.runtime.spawn(async move {
            if let Err(e) = send_datagram(&socket, &host, port, wire.as_bytes()).await {
                let err = TransportError::Unreachable(format!("{}:{}: {}", host, port, e));
                warn!("{}", err);
                if let Some(branch) = branch {
                    pending.fail(&branch, err);
                }
            }
        });
        Ok(())
    }

    fn local_addr(&self) -> (String, u16) {
        (self.options.address.clone(), self.local.port())
    }

    fn pending_responses(&self) -> usize {
        self.pending.len()
    }

    fn destroy(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pending.clear();
        self.task.abort();
        info!("UDP transport {} closed", self.local);
    }
}

impl Drop for UdpHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for UdpHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UdpTransport({})", self.local)
    }
}
