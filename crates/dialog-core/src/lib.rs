//! # sipprobe dialog-core
//!
//! Endpoint and dialog engine for a programmable SIP user agent. An
//! [`Engine`] owns any number of endpoints (each bound to one transport) and
//! the dialogs they take part in. The owner drives it with explicit
//! operations and observes everything through one event stream.
//!
//! ```text
//!            ┌──────────── Engine ─────────────┐
//!  owner ───►│ create_endpoint  create_dialog  │───► TransportHandle ───► network
//!            │ send_*_request   send_*_reply   │
//!  owner ◄───│ EndpointEvent stream            │◄─── on_request / on_response
//!            └─────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sipprobe_dialog_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let network = LoopbackNetwork::new();
//! let (engine, mut events) = Engine::new(EngineConfig::default(), Arc::new(network))?;
//! let ada = engine.create_endpoint(EndpointOptions::new("127.0.0.1", 5070))?;
//! let _bob = engine.create_endpoint(EndpointOptions::new("127.0.0.1", 5080))?;
//!
//! let invite = MessageOverrides::new()
//!     .method(Method::Invite)
//!     .uri("sip:bob@127.0.0.1:5080")
//!     .from(NameAddr::new("sip:ada@test1.com"))
//!     .to(NameAddr::new("sip:bob@127.0.0.1"));
//! engine.create_dialog(ada, &invite, None)?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{}: {}", event.name(), event.endpoint_id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialog;
pub mod endpoint;
pub mod errors;
pub mod events;
pub mod manager;
pub mod transport;

pub use config::{EndpointOptions, EngineConfig, TransportKind};
pub use dialog::{Dialog, DialogId, DialogState, Direction, EndpointId};
pub use endpoint::EndpointInfo;
pub use errors::{DialogError, DialogResult};
pub use events::{EndpointEvent, ErrorOrigin, EventKind, EventReceiver};
pub use manager::{Engine, Reply, SignRequest};
pub use transport::{
    LoopbackNetwork, TransportError, TransportFactory, TransportHandle, UdpTransportFactory,
};

/// Re-export of common types
pub mod prelude {
    pub use super::{
        Dialog, DialogError, DialogId, DialogResult, DialogState, EndpointEvent, EndpointId,
        EndpointOptions, Engine, EngineConfig, EventKind, LoopbackNetwork, Reply, SignRequest,
        UdpTransportFactory,
    };
    pub use sipprobe_sip_core::{
        build_matcher, ChallengeParams, Credentials, Expect, HeaderValue, MessageOverrides,
        MessageView, Method, NameAddr, SipMatcher, SipMessage,
    };
}
