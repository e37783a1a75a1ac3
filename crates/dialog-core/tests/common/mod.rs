//! Shared helpers for engine integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use sipprobe_dialog_core::transport::{TransportHandle, TransportOptions};
use sipprobe_dialog_core::{
    EndpointEvent, EndpointId, EndpointOptions, Engine, EngineConfig, EventReceiver,
    LoopbackNetwork, TransportFactory, TransportKind,
};
use sipprobe_sip_core::{Method, MessageOverrides, NameAddr, SipMessage};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine on a loopback network plus an event buffer that lets tests wait
/// for one endpoint's events without caring how they interleave.
pub struct Harness {
    pub engine: Engine,
    pub network: LoopbackNetwork,
    events: EventReceiver,
    backlog: VecDeque<EndpointEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_network(config, LoopbackNetwork::new())
    }

    pub fn with_network(config: EngineConfig, network: LoopbackNetwork) -> Self {
        init_tracing();
        let (engine, events) = Engine::new(config, Arc::new(network.clone())).expect("engine");
        Self {
            engine,
            network,
            events,
            backlog: VecDeque::new(),
        }
    }

    pub fn endpoint(&self, port: u16) -> EndpointId {
        self.engine
            .create_endpoint(EndpointOptions::new("127.0.0.1", port))
            .expect("endpoint")
    }

    /// Next event for `endpoint_id` named `name`; other events are kept
    pub async fn wait_for(&mut self, endpoint_id: EndpointId, name: &str) -> EndpointEvent {
        if let Some(pos) = self
            .backlog
            .iter()
            .position(|e| e.endpoint_id == endpoint_id && e.name() == name)
        {
            return self.backlog.remove(pos).expect("backlog entry");
        }
        loop {
            let event = timeout(EVENT_TIMEOUT, self.events.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {} (backlog: {:?})", name, self.backlog))
                .expect("event stream closed");
            if event.endpoint_id == endpoint_id && event.name() == name {
                return event;
            }
            self.backlog.push_back(event);
        }
    }

    /// Request carried by the next `name` event of `endpoint_id`
    pub async fn request(&mut self, endpoint_id: EndpointId, name: &str) -> SipMessage {
        self.wait_for(endpoint_id, name)
            .await
            .message()
            .cloned()
            .expect("event carries a message")
    }

    /// Next response delivered to `endpoint_id`
    pub async fn response(&mut self, endpoint_id: EndpointId) -> SipMessage {
        self.request(endpoint_id, "response").await
    }

    /// Assert nothing else arrives for a short while
    pub async fn assert_quiet(&mut self) {
        assert!(self.backlog.is_empty(), "unexpected events: {:?}", self.backlog);
        if let Ok(Some(event)) = timeout(Duration::from_millis(100), self.events.recv()).await {
            panic!("unexpected event: {:?}", event);
        }
    }
}

/// INVITE from ada@test1.com to bob at `port`
pub fn invite_to(port: u16) -> MessageOverrides {
    MessageOverrides::new()
        .method(Method::Invite)
        .uri(format!("sip:bob@127.0.0.1:{}", port))
        .from(NameAddr::new("sip:ada@test1.com").with_display_name("Ada"))
        .to(NameAddr::new("sip:bob@test2.com"))
        .header("Content-Type", "application/sdp")
        .body("v=0\r\no=ada 1 1 IN IP4 127.0.0.1\r\ns=-\r\n")
}

/// Transport bound straight onto the loopback network, for playing a peer
/// that does things the engine never would.
pub struct RawPeer {
    pub handle: Box<dyn TransportHandle>,
    pub inbox: mpsc::UnboundedReceiver<SipMessage>,
}

impl RawPeer {
    pub fn bind(network: &LoopbackNetwork, port: u16) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();
        let options = TransportOptions {
            address: "127.0.0.1".to_string(),
            port,
            public_address: None,
            kind: TransportKind::Udp,
        };
        let handle = network
            .create(&options, Arc::new(move |msg| {
                let _ = tx.send(msg);
            }))
            .expect("raw peer");
        Self { handle, inbox }
    }

    pub async fn recv(&mut self) -> SipMessage {
        timeout(EVENT_TIMEOUT, self.inbox.recv())
            .await
            .expect("timed out waiting for peer message")
            .expect("peer inbox closed")
    }

    pub fn send(&self, msg: SipMessage) {
        self.handle.send(msg, None).expect("peer send");
    }

    pub fn send_raw(&self, raw: &str) {
        self.send(SipMessage::parse(raw).expect("raw message parses"));
    }
}
