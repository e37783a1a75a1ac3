//! # SIP URI
//!
//! A SIP URI has the general form:
//!
//! ```text
//! sip:user:password@host:port;uri-parameters?headers
//! ```
//!
//! Dialog state keeps URIs as verbatim strings (a Contact is replayed exactly
//! as it was received). [`SipUri`] is the split form used when a caller needs
//! the user, host or port; it is produced on demand by [`SipUri::parse`].
//!
//! ```rust
//! use sipprobe_sip_core::SipUri;
//!
//! let uri = SipUri::parse("sip:alice@example.com:5060;transport=udp").unwrap();
//! assert_eq!(uri.scheme, "sip");
//! assert_eq!(uri.user.as_deref(), Some("alice"));
//! assert_eq!(uri.host, "example.com");
//! assert_eq!(uri.port, Some(5060));
//! assert_eq!(uri.params.value("transport"), Some("udp"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parser::uri::parse_uri;
use crate::types::param::Params;

/// Default SIP port used when a URI carries none
pub const DEFAULT_SIP_PORT: u16 = 5060;

/// A split SIP (or other scheme) URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SipUri {
    /// Lowercase scheme (`sip`, `sips`, `tel`, ...)
    pub scheme: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Host name or address; IPv6 references keep their brackets
    pub host: String,
    pub port: Option<u16>,
    pub params: Params,
    /// Raw `?headers` component without the question mark
    pub headers: Option<String>,
}

impl SipUri {
    /// Parse a URI string
    pub fn parse(input: &str) -> Result<Self> {
        parse_uri(input.trim())
    }

    /// Host and port, defaulting the port to 5060
    pub fn host_port(&self) -> (String, u16) {
        (self.host.clone(), self.port.unwrap_or(DEFAULT_SIP_PORT))
    }

    pub fn is_sip(&self) -> bool {
        self.scheme == "sip" || self.scheme == "sips"
    }
}

impl FromStr for SipUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SipUri::parse(s)
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            f.write_str(user)?;
            if let Some(password) = &self.password {
                write!(f, ":{}", password)?;
            }
            if !self.host.is_empty() {
                f.write_str("@")?;
            }
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "{}", self.params)?;
        if let Some(headers) = &self.headers {
            write!(f, "?{}", headers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_uri() {
        let uri = SipUri::parse("sips:bob:secret@[2001:db8::1]:5061;transport=tls;lr?subject=x").unwrap();
        assert_eq!(uri.scheme, "sips");
        assert_eq!(uri.user.as_deref(), Some("bob"));
        assert_eq!(uri.password.as_deref(), Some("secret"));
        assert_eq!(uri.host, "[2001:db8::1]");
        assert_eq!(uri.port, Some(5061));
        assert_eq!(uri.params.get("lr"), Some(None));
        assert_eq!(uri.headers.as_deref(), Some("subject=x"));
    }

    #[test]
    fn test_parse_host_only() {
        let uri = SipUri::parse("sip:proxy.example.com;lr").unwrap();
        assert!(uri.user.is_none());
        assert_eq!(uri.host, "proxy.example.com");
        assert_eq!(uri.host_port(), ("proxy.example.com".to_string(), 5060));
    }

    #[test]
    fn test_display_round_trip() {
        let text = "sip:ada@test1.com:7070;transport=udp";
        assert_eq!(SipUri::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn test_tel_uri() {
        let uri = SipUri::parse("tel:+15551234;phone-context=example.com").unwrap();
        assert_eq!(uri.scheme, "tel");
        assert_eq!(uri.user.as_deref(), Some("+15551234"));
        assert!(uri.host.is_empty());
        assert!(!uri.is_sip());
    }

    #[test]
    fn test_malformed_uri() {
        assert!(SipUri::parse("not a uri").is_err());
        assert!(SipUri::parse("sip:").is_err());
        assert!(SipUri::parse("sip:host:notaport").is_err());
    }
}
