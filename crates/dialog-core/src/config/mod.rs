//! Configuration module for dialog-core
//!
//! Two layers of configuration:
//!
//! - [`EngineConfig`]: process-wide defaults applied to every outbound
//!   request (Contact user and scheme, Max-Forwards, User-Agent)
//! - [`EndpointOptions`]: per-endpoint bind address and identity, checked
//!   by [`EndpointOptions::validate`] before a transport is created

use serde::{Deserialize, Serialize};

use crate::errors::{DialogError, DialogResult};

/// Default Max-Forwards for requests that do not set one (RFC 3261 Section 8.1.1.6)
pub const DEFAULT_MAX_FORWARDS: u32 = 70;

/// Engine-wide defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// User part of generated Contact URIs
    pub contact_user: String,

    /// Scheme of generated Contact URIs
    pub contact_scheme: String,

    /// Max-Forwards added to requests that lack one
    pub max_forwards: u32,

    /// User-Agent added to requests that lack one
    pub user_agent: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contact_user: "sipprobe".to_string(),
            contact_scheme: "sip".to_string(),
            max_forwards: DEFAULT_MAX_FORWARDS,
            user_agent: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact_user(mut self, user: impl Into<String>) -> Self {
        self.contact_user = user.into();
        self
    }

    pub fn with_contact_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.contact_scheme = scheme.into();
        self
    }

    pub fn with_max_forwards(mut self, max_forwards: u32) -> Self {
        self.max_forwards = max_forwards;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn validate(&self) -> DialogResult<()> {
        if self.contact_user.is_empty() {
            return Err(DialogError::configuration("contact_user cannot be empty"));
        }
        if self.contact_scheme.is_empty() {
            return Err(DialogError::configuration("contact_scheme cannot be empty"));
        }
        Ok(())
    }
}

/// Transport token written into Via headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Udp,
    Tcp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Udp => "UDP",
            TransportKind::Tcp => "TCP",
        }
    }
}

/// Options for `create_endpoint`
///
/// `address` and `port` are mandatory; everything else falls back to the
/// engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOptions {
    /// Local bind address
    pub address: Option<String>,

    /// Local bind port
    pub port: Option<u16>,

    /// Address advertised in Via sent-by instead of the bind address
    pub public_address: Option<String>,

    /// Contact user for this endpoint, overriding [`EngineConfig::contact_user`]
    pub contact_user: Option<String>,

    pub transport: TransportKind,
}

impl EndpointOptions {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: Some(address.into()),
            port: Some(port),
            ..Default::default()
        }
    }

    pub fn with_public_address(mut self, address: impl Into<String>) -> Self {
        self.public_address = Some(address.into());
        self
    }

    pub fn with_contact_user(mut self, user: impl Into<String>) -> Self {
        self.contact_user = Some(user.into());
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Bind address and port, or a configuration error naming the missing one
    pub fn validate(&self) -> DialogResult<(String, u16)> {
        let address = self
            .address
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| DialogError::configuration("endpoint address is required"))?;
        let port = self
            .port
            .ok_or_else(|| DialogError::configuration("endpoint port is required"))?;
        Ok((address.trim().to_string(), port))
    }
}
