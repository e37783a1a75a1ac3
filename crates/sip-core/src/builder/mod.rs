//! # Message Builder
//!
//! Outbound messages are assembled from three layers, in this order:
//!
//! 1. an optional template message, with the transport-owned headers
//!    removed by [`strip_template`];
//! 2. caller overrides ([`MessageOverrides`]) applied with one merge rule:
//!    scalars are replaced, mappings (name-addr fields, parameters, CSeq
//!    fields, the header map itself) merge key-wise, lists are replaced
//!    wholesale;
//! 3. protocol fields enforced by the caller (the dialog engine).
//!
//! ```rust
//! use sipprobe_sip_core::builder::{build_request, MessageOverrides};
//! use sipprobe_sip_core::{Method, NameAddr};
//!
//! let overrides = MessageOverrides::new()
//!     .method(Method::Options)
//!     .uri("sip:bob@B")
//!     .from(NameAddr::new("sip:ada@test1.com"))
//!     .to(NameAddr::new("sip:bob@B"))
//!     .header("Subject", "ping");
//! let msg = build_request(None, &overrides).unwrap();
//! assert_eq!(msg.uri(), Some("sip:bob@B"));
//! assert_eq!(msg.headers.text("subject").as_deref(), Some("ping"));
//! ```

mod overrides;
mod response;

pub use overrides::{AddressPatch, HeaderPatch, MessageOverrides};
pub use response::{build_response, derive_reply_tag, make_response};

use rand::Rng;

use crate::error::{Error, Result};
use crate::types::sip_message::SipMessage;

/// Headers the transport and the engine regenerate on every send
pub const TRANSPORT_HEADERS: &[&str] = &["via", "route", "contact", "record-route", "content-length"];

/// Copy of a template with the transport-owned headers removed
pub fn strip_template(template: &SipMessage) -> SipMessage {
    let mut stripped = template.clone();
    for name in TRANSPORT_HEADERS {
        stripped.headers.remove(name);
    }
    stripped
}

/// Build a request from an optional template plus overrides.
///
/// Without a template the overrides must name both the method and the
/// Request-URI.
pub fn build_request(template: Option<&SipMessage>, overrides: &MessageOverrides) -> Result<SipMessage> {
    let mut msg = match template {
        Some(template) if template.is_request() => strip_template(template),
        Some(_) => {
            return Err(Error::InvalidFormat(
                "request template must be a request".to_string(),
            ))
        }
        None => {
            let method = overrides
                .method
                .clone()
                .ok_or_else(|| Error::MissingField("method".to_string()))?;
            let uri = overrides
                .uri
                .clone()
                .ok_or_else(|| Error::MissingField("uri".to_string()))?;
            SipMessage::request(method, uri)
        }
    };
    overrides.apply_to(&mut msg)?;
    Ok(msg)
}

/// Random tag token for From/To headers
pub fn generate_tag() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

/// Random Call-ID, qualified with the given host
pub fn generate_call_id(host: &str) -> String {
    let mut rng = rand::thread_rng();
    format!("{:016x}{:08x}@{}", rng.gen::<u64>(), rng.gen::<u32>(), host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::address::NameAddr;
    use crate::types::headers::HeaderValue;
    use crate::types::method::Method;

    fn template() -> SipMessage {
        SipMessage::parse(
            "INVITE sip:bob@B SIP/2.0\r\n\
             Via: SIP/2.0/UDP old;branch=z9hG4bKold\r\n\
             Route: <sip:p1;lr>\r\n\
             Contact: <sip:old@old>\r\n\
             From: <sip:ada@test1.com>;tag=1\r\n\
             To: <sip:bob@B>\r\n\
             Subject: hi\r\n\
             Content-Length: 3\r\n\r\nabc",
        )
        .unwrap()
    }

    #[test]
    fn test_strip_template() {
        let stripped = strip_template(&template());
        for name in ["via", "route", "contact", "content-length"] {
            assert!(!stripped.headers.contains(name), "{} kept", name);
        }
        assert!(stripped.headers.contains("subject"));
        assert_eq!(stripped.body, "abc");
    }

    #[test]
    fn test_build_request_requires_method_and_uri() {
        let err = build_request(None, &MessageOverrides::new().uri("sip:b")).unwrap_err();
        assert_eq!(err, Error::MissingField("method".to_string()));
        let err = build_request(None, &MessageOverrides::new().method(Method::Info)).unwrap_err();
        assert_eq!(err, Error::MissingField("uri".to_string()));
    }

    #[test]
    fn test_build_request_template_then_overrides() {
        let overrides = MessageOverrides::new()
            .header("Subject", "override")
            .body("xyz");
        let msg = build_request(Some(&template()), &overrides).unwrap();
        assert_eq!(msg.headers.text("subject").as_deref(), Some("override"));
        assert_eq!(msg.from_tag(), Some("1"));
        assert_eq!(msg.body, "xyz");
        assert!(!msg.headers.contains("via"));
        assert_eq!(
            msg.headers.first("to"),
            Some(&HeaderValue::Address(NameAddr::new("sip:bob@B")))
        );
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(generate_tag(), generate_tag());
        assert!(generate_call_id("127.0.0.1").ends_with("@127.0.0.1"));
    }
}
