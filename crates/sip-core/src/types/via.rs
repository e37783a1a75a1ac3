//! # SIP Via Header
//!
//! ```text
//! Via: SIP/2.0/UDP pc33.atlanta.com:5060;branch=z9hG4bK776asdhds
//! ```
//!
//! Via entries are owned by the transport collaborator: it adds the top entry
//! with a fresh branch and routes responses back by that branch.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::param::Params;

/// RFC 3261 magic cookie every compliant branch starts with
pub const BRANCH_MAGIC_COOKIE: &str = "z9hG4bK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Via {
    /// Protocol version, normally `2.0`
    pub version: String,
    /// Transport token (`UDP`, `TCP`, `TLS`, ...)
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
    pub params: Params,
}

impl Via {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            version: "2.0".to_string(),
            protocol: protocol.into(),
            host: host.into(),
            port,
            params: Params::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.params.set("branch", Some(branch.into()));
        self
    }

    /// Ask the next hop to answer to the source port (RFC 3581)
    pub fn with_rport(mut self) -> Self {
        self.params.set("rport", None);
        self
    }

    pub fn branch(&self) -> Option<&str> {
        self.params.value("branch")
    }

    /// `host:port` the response should be sent to, honouring `received`/`rport`
    pub fn response_target(&self) -> (String, u16) {
        let host = self
            .params
            .value("received")
            .map(str::to_string)
            .unwrap_or_else(|| self.host.clone());
        let port = self
            .params
            .value("rport")
            .and_then(|p| p.parse().ok())
            .or(self.port)
            .unwrap_or(crate::types::uri::DEFAULT_SIP_PORT);
        (host, port)
    }
}

impl fmt::Display for Via {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIP/{}/{} {}", self.version, self.protocol, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "{}", self.params)
    }
}

/// Generate a new RFC 3261 branch identifier
pub fn generate_branch() -> String {
    let mut rng = rand::thread_rng();
    format!("{}{:016x}", BRANCH_MAGIC_COOKIE, rng.gen::<u64>())
}
