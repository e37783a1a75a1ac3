//! # SIP Message
//!
//! [`SipMessage`] is the one representation shared by the wire codec, the
//! Message Model, the matcher and the dialog engine. A request and a
//! response differ only in their [`StartLine`].
//!
//! ```rust
//! use sipprobe_sip_core::{Method, SipMessage};
//!
//! let raw = "OPTIONS sip:bob@B SIP/2.0\r\n\
//!            Call-ID: abc\r\n\
//!            CSeq: 1 OPTIONS\r\n\
//!            \r\n";
//! let msg: SipMessage = raw.parse().unwrap();
//! assert_eq!(msg.method(), Some(&Method::Options));
//! assert_eq!(msg.call_id(), Some("abc"));
//! assert!(msg.to_wire().contains("Content-Length: 0\r\n"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::address::NameAddr;
use crate::types::headers::{CSeq, HeaderValue, Headers};
use crate::types::method::Method;
use crate::types::via::Via;

/// Default protocol version token
pub const SIP_VERSION: &str = "SIP/2.0";

/// Request-Line or Status-Line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StartLine {
    Request { method: Method, uri: String },
    Response { status: u16, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipMessage {
    pub start_line: StartLine,
    /// Version token as carried on the wire (`SIP/2.0`)
    pub version: String,
    pub headers: Headers,
    /// Opaque body
    pub body: String,
}

impl SipMessage {
    pub fn request(method: Method, uri: impl Into<String>) -> Self {
        Self {
            start_line: StartLine::Request {
                method,
                uri: uri.into(),
            },
            version: SIP_VERSION.to_string(),
            headers: Headers::new(),
            body: String::new(),
        }
    }

    pub fn response(status: u16, reason: impl Into<String>) -> Self {
        Self {
            start_line: StartLine::Response {
                status,
                reason: reason.into(),
            },
            version: SIP_VERSION.to_string(),
            headers: Headers::new(),
            body: String::new(),
        }
    }

    /// Parse the text form of a message
    pub fn parse(raw: &str) -> Result<Self> {
        crate::parser::parse_message(raw)
    }

    pub fn is_request(&self) -> bool {
        matches!(self.start_line, StartLine::Request { .. })
    }

    pub fn is_response(&self) -> bool {
        !self.is_request()
    }

    /// Request method, or `None` for a response
    pub fn method(&self) -> Option<&Method> {
        match &self.start_line {
            StartLine::Request { method, .. } => Some(method),
            StartLine::Response { .. } => None,
        }
    }

    /// Request method, or the CSeq method for a response
    pub fn effective_method(&self) -> Option<&Method> {
        self.method().or_else(|| self.cseq().map(|cseq| &cseq.method))
    }

    pub fn uri(&self) -> Option<&str> {
        match &self.start_line {
            StartLine::Request { uri, .. } => Some(uri),
            StartLine::Response { .. } => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match &self.start_line {
            StartLine::Response { status, .. } => Some(*status),
            StartLine::Request { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.start_line {
            StartLine::Response { reason, .. } => Some(reason),
            StartLine::Request { .. } => None,
        }
    }

    pub fn set_uri(&mut self, new_uri: impl Into<String>) -> Result<()> {
        match &mut self.start_line {
            StartLine::Request { uri, .. } => {
                *uri = new_uri.into();
                Ok(())
            }
            StartLine::Response { .. } => Err(Error::InvalidFormat(
                "a response has no Request-URI".to_string(),
            )),
        }
    }

    pub fn call_id(&self) -> Option<&str> {
        self.headers.call_id()
    }

    pub fn cseq(&self) -> Option<&CSeq> {
        self.headers.cseq()
    }

    pub fn from(&self) -> Option<&NameAddr> {
        self.headers.from()
    }

    pub fn to(&self) -> Option<&NameAddr> {
        self.headers.to()
    }

    pub fn from_tag(&self) -> Option<&str> {
        self.from().and_then(NameAddr::tag)
    }

    pub fn to_tag(&self) -> Option<&str> {
        self.to().and_then(NameAddr::tag)
    }

    pub fn top_via(&self) -> Option<&Via> {
        self.headers.first("via").and_then(HeaderValue::as_via)
    }

    /// Branch parameter of the top Via
    pub fn branch(&self) -> Option<&str> {
        self.top_via().and_then(Via::branch)
    }

    /// URI of the first Contact value
    pub fn contact_uri(&self) -> Option<&str> {
        self.headers.address("contact").map(|c| c.uri.as_str())
    }

    /// Record-Route values rendered verbatim, in order
    pub fn record_route(&self) -> Vec<String> {
        self.headers
            .values("record-route")
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn with_header(mut self, name: &str, value: impl Into<HeaderValue>) -> Self {
        self.headers.append(name, value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize to wire text; Content-Length is always regenerated
    pub fn to_wire(&self) -> String {
        let mut out = String::with_capacity(256 + self.body.len());
        match &self.start_line {
            StartLine::Request { method, uri } => {
                out.push_str(&format!("{} {} {}\r\n", method, uri, self.version));
            }
            StartLine::Response { status, reason } => {
                out.push_str(&format!("{} {} {}\r\n", self.version, status, reason));
            }
        }
        for (name, entry) in self.headers.iter() {
            if name.as_str() == "content-length" {
                continue;
            }
            let wire_name = name.wire_form();
            for value in entry.values() {
                out.push_str(&format!("{}: {}\r\n", wire_name, value));
            }
        }
        out.push_str(&format!("Content-Length: {}\r\n\r\n", self.body.len()));
        out.push_str(&self.body);
        out
    }
}

impl fmt::Display for SipMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for SipMessage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SipMessage::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let res = SipMessage::response(180, "Ringing")
            .with_header("CSeq", CSeq::new(1, Method::Invite));
        assert!(res.is_response());
        assert_eq!(res.method(), None);
        assert_eq!(res.effective_method(), Some(&Method::Invite));
        assert_eq!(res.status(), Some(180));
    }

    #[test]
    fn test_to_wire_regenerates_content_length() {
        let msg = SipMessage::request(Method::Message, "sip:bob@B")
            .with_header("l", "999")
            .with_header("Content-Type", "text/plain")
            .with_body("hello");
        let wire = msg.to_wire();
        assert!(wire.starts_with("MESSAGE sip:bob@B SIP/2.0\r\n"));
        assert!(wire.contains("Content-Type: text/plain\r\n"));
        assert!(wire.ends_with("Content-Length: 5\r\n\r\nhello"));
        assert!(!wire.contains("999"));
    }

    #[test]
    fn test_set_uri_on_response_fails() {
        let mut res = SipMessage::response(200, "OK");
        assert!(res.set_uri("sip:x@y").is_err());
    }
}
