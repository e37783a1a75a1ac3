//! # Digest Authentication
//!
//! The dialog engine signs requests and challenges replies through the
//! [`DigestAuthenticator`] trait. [`Md5Digest`] implements RFC 2617 / RFC 3261
//! digest with MD5.

mod digest;

use serde::{Deserialize, Serialize};

pub use digest::{compute_response, Md5Digest, QopParams};

use crate::error::Result;
use crate::types::sip_message::SipMessage;

/// Username and password used to answer a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Parameters of a challenge a reply should carry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeParams {
    pub realm: String,
    /// Generated when absent
    pub nonce: Option<String>,
    pub opaque: Option<String>,
    /// Offer `qop="auth"`
    pub qop_auth: bool,
    pub stale: bool,
}

impl ChallengeParams {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            ..Default::default()
        }
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_opaque(mut self, opaque: impl Into<String>) -> Self {
        self.opaque = Some(opaque.into());
        self
    }

    pub fn with_qop_auth(mut self) -> Self {
        self.qop_auth = true;
        self
    }
}

/// Digest authentication collaborator
pub trait DigestAuthenticator: Send + Sync {
    /// Add Authorization (401) or Proxy-Authorization (407) to `request`
    /// answering the challenge carried by `challenge`.
    fn sign_request(
        &self,
        request: &mut SipMessage,
        challenge: &SipMessage,
        credentials: &Credentials,
    ) -> Result<()>;

    /// Add WWW-Authenticate (401) or Proxy-Authenticate (407) to `response`
    fn build_challenge(&self, params: &ChallengeParams, response: &mut SipMessage) -> Result<()>;
}
