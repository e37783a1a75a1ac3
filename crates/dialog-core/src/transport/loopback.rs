//! In-process network
//!
//! Every endpoint created through a [`LoopbackNetwork`] becomes a node keyed
//! by `host:port`. Messages are serialized to wire text on send and parsed
//! again on delivery, so both sides see exactly what a socket would carry.
//! Each node drains its inbox on one task, which keeps delivery ordered per
//! endpoint.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use sipprobe_sip_core::SipMessage;

use super::{
    request_destination, response_destination, stamp_via, PendingResponses, RequestHandler,
    ResponseHandler, TransportError, TransportFactory, TransportHandle, TransportOptions,
    INVITE_LINGER,
};

const FIRST_EPHEMERAL_PORT: u16 = 40000;

fn node_key(host: &str, port: u16) -> String {
    format!("{}:{}", host.to_ascii_lowercase(), port)
}

struct NetworkInner {
    nodes: DashMap<String, mpsc::UnboundedSender<String>>,
    next_port: AtomicU16,
    invite_linger: Duration,
}

/// Shared in-process network; clones refer to the same set of nodes
#[derive(Clone)]
pub struct LoopbackNetwork {
    inner: Arc<NetworkInner>,
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::with_invite_linger(INVITE_LINGER)
    }

    /// Network whose nodes keep INVITE response callbacks for `linger`
    /// after the first final response
    pub fn with_invite_linger(linger: Duration) -> Self {
        Self {
            inner: Arc::new(NetworkInner {
                nodes: DashMap::new(),
                next_port: AtomicU16::new(FIRST_EPHEMERAL_PORT),
                invite_linger: linger,
            }),
        }
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.inner.nodes.len()
    }

    fn deliver(&self, host: &str, port: u16, wire: String) -> Result<(), TransportError> {
        let key = node_key(host, port);
        match self.inner.nodes.get(&key) {
            Some(inbox) => inbox
                .send(wire)
                .map_err(|_| TransportError::Unreachable(key.clone())),
            None => Err(TransportError::Unreachable(key)),
        }
    }

    fn release(&self, keys: &[String]) {
        for key in keys {
            self.inner.nodes.remove(key);
        }
    }
}

impl fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoopbackNetwork({} nodes)", self.node_count())
    }
}

impl TransportFactory for LoopbackNetwork {
    fn create(
        &self,
        options: &TransportOptions,
        on_request: RequestHandler,
    ) -> Result<Box<dyn TransportHandle>, TransportError> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let port = match options.port {
            0 => self.inner.next_port.fetch_add(1, Ordering::Relaxed),
            port => port,
        };
        let mut options = options.clone();
        options.port = port;

        let mut keys = vec![node_key(&options.address, port)];
        if let Some(public) = &options.public_address {
            let alias = node_key(public, port);
            if !keys.contains(&alias) {
                keys.push(alias);
            }
        }

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        for (i, key) in keys.iter().enumerate() {
            match self.inner.nodes.entry(key.clone()) {
                Entry::Occupied(_) => {
                    self.release(&keys[..i]);
                    return Err(TransportError::AddressInUse(key.clone()));
                }
                Entry::Vacant(slot) => {
                    slot.insert(inbox_tx.clone());
                }
            }
        }

        let pending = Arc::new(PendingResponses::with_linger(self.inner.invite_linger));
        let task = runtime.spawn(receive_loop(inbox_rx, on_request, pending.clone(), keys[0].clone()));
        debug!(node = %keys[0], "loopback node up");

        Ok(Box::new(LoopbackHandle {
            network: self.clone(),
            options,
            keys,
            pending,
            task,
            runtime,
            closed: AtomicBool::new(false),
        }))
    }
}

async fn receive_loop(
    mut inbox: mpsc::UnboundedReceiver<String>,
    on_request: RequestHandler,
    pending: Arc<PendingResponses>,
    node: String,
) {
    while let Some(wire) = inbox.recv().await {
        let msg = match SipMessage::parse(&wire) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(node = %node, "dropping unparseable message: {}", e);
                continue;
            }
        };
        if msg.is_response() {
            if let Some(unmatched) = pending.dispatch(msg) {
                trace!(node = %node, "response matches no pending request");
                on_request(unmatched);
            }
        } else {
            on_request(msg);
        }
    }
    debug!(node = %node, "loopback node stopped");
}

struct LoopbackHandle {
    network: LoopbackNetwork,
    options: TransportOptions,
    keys: Vec<String>,
    pending: Arc<PendingResponses>,
    task: JoinHandle<()>,
    runtime: Handle,
    closed: AtomicBool,
}

impl TransportHandle for LoopbackHandle {
    fn send(&self, mut msg: SipMessage, on_response: Option<ResponseHandler>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        if msg.is_response() {
            let (host, port) = response_destination(&msg)?;
            trace!(to = %node_key(&host, port), status = ?msg.status(), "loopback send response");
            if let Err(e) = self.network.deliver(&host, port, msg.to_wire()) {
                warn!("dropping response: {}", e);
            }
            return Ok(());
        }

        let branch = stamp_via(&mut msg, &self.options, self.options.port);
        let (host, port) = request_destination(&msg)?;
        if let Some(handler) = on_response {
            self.pending.register(branch.clone(), handler);
        }
        trace!(to = %node_key(&host, port), method = ?msg.method(), "loopback send request");
        if let Err(e) = self.network.deliver(&host, port, msg.to_wire()) {
            let pending = self.pending.clone();
            self.runtime.spawn(async move { pending.fail(&branch, e) });
        }
        Ok(())
    }

    fn local_addr(&self) -> (String, u16) {
        (self.options.address.clone(), self.options.port)
    }

    fn pending_responses(&self) -> usize {
        self.pending.len()
    }

    fn destroy(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.network.release(&self.keys);
        self.pending.clear();
        self.task.abort();
        debug!(node = %self.keys[0], "loopback node destroyed");
    }
}

impl Drop for LoopbackHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}
