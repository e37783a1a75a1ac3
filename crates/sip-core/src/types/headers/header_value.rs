use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::address::NameAddr;
use crate::types::method::Method;
use crate::types::param::Params;
use crate::types::via::Via;

/// CSeq header value: sequence number plus method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CSeq {
    pub seq: u32,
    pub method: Method,
}

impl CSeq {
    pub fn new(seq: u32, method: Method) -> Self {
        Self { seq, method }
    }
}

impl fmt::Display for CSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.seq, self.method)
    }
}

/// Authentication header value (`Digest realm="x", nonce="y", ...`)
///
/// Used for Authorization, Proxy-Authorization, WWW-Authenticate and
/// Proxy-Authenticate. Parameter values keep their quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthParams {
    pub scheme: String,
    pub params: Params,
}

impl AuthParams {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            params: Params::new(),
        }
    }

    /// Parameter value with surrounding quotes removed
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.value(name).map(crate::types::param::unquote)
    }

    /// Set a parameter, wrapping the value in quotes
    pub fn set_quoted(&mut self, name: &str, value: &str) {
        self.params.set(name, Some(format!("\"{}\"", value)));
    }

    /// Set a parameter verbatim (token values such as `qop=auth`, `nc=00000001`)
    pub fn set_token(&mut self, name: &str, value: &str) {
        self.params.set(name, Some(value.to_string()));
    }
}

impl fmt::Display for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scheme)?;
        for (i, param) in self.params.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            write!(f, "{}", param)?;
        }
        Ok(())
    }
}

/// One header value in structured form
///
/// Headers the engine reasons about are parsed eagerly; everything else stays
/// as text. A header whose structured parse fails is also kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum HeaderValue {
    Text(String),
    Address(NameAddr),
    CSeq(CSeq),
    Via(Via),
    Auth(AuthParams),
}

impl HeaderValue {
    pub fn text(value: impl Into<String>) -> Self {
        HeaderValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&NameAddr> {
        match self {
            HeaderValue::Address(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn as_address_mut(&mut self) -> Option<&mut NameAddr> {
        match self {
            HeaderValue::Address(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn as_cseq(&self) -> Option<&CSeq> {
        match self {
            HeaderValue::CSeq(cseq) => Some(cseq),
            _ => None,
        }
    }

    pub fn as_via(&self) -> Option<&Via> {
        match self {
            HeaderValue::Via(via) => Some(via),
            _ => None,
        }
    }

    pub fn as_auth(&self) -> Option<&AuthParams> {
        match self {
            HeaderValue::Auth(auth) => Some(auth),
            _ => None,
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Text(text) => f.write_str(text),
            HeaderValue::Address(addr) => write!(f, "{}", addr),
            HeaderValue::CSeq(cseq) => write!(f, "{}", cseq),
            HeaderValue::Via(via) => write!(f, "{}", via),
            HeaderValue::Auth(auth) => write!(f, "{}", auth),
        }
    }
}

impl From<NameAddr> for HeaderValue {
    fn from(addr: NameAddr) -> Self {
        HeaderValue::Address(addr)
    }
}

impl From<CSeq> for HeaderValue {
    fn from(cseq: CSeq) -> Self {
        HeaderValue::CSeq(cseq)
    }
}

impl From<Via> for HeaderValue {
    fn from(via: Via) -> Self {
        HeaderValue::Via(via)
    }
}

impl From<AuthParams> for HeaderValue {
    fn from(auth: AuthParams) -> Self {
        HeaderValue::Auth(auth)
    }
}

impl From<&str> for HeaderValue {
    fn from(text: &str) -> Self {
        HeaderValue::Text(text.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(text: String) -> Self {
        HeaderValue::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_params_display() {
        let mut auth = AuthParams::new("Digest");
        auth.set_quoted("realm", "test1.com");
        auth.set_token("algorithm", "MD5");
        assert_eq!(auth.to_string(), "Digest realm=\"test1.com\", algorithm=MD5");
        assert_eq!(auth.get("realm"), Some("test1.com"));
    }

    #[test]
    fn test_cseq_display() {
        assert_eq!(CSeq::new(42, Method::Invite).to_string(), "42 INVITE");
    }
}
