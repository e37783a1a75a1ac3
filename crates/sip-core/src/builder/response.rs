use md5::{Digest, Md5};

use super::{strip_template, MessageOverrides};
use crate::error::{Error, Result};
use crate::types::sip_message::SipMessage;

/// Headers a response copies from its request (RFC 3261 Section 8.2.6.2)
const COPIED_FROM_REQUEST: &[&str] = &["via", "from", "to", "call-id", "cseq", "record-route"];

/// Minimal response to `request`: Via, From, To, Call-ID, CSeq and
/// Record-Route copied verbatim.
pub fn make_response(request: &SipMessage, status: u16, reason: &str) -> SipMessage {
    let mut response = SipMessage::response(status, reason);
    response.version = request.version.clone();
    for name in COPIED_FROM_REQUEST {
        if let Some(entry) = request.headers.get(name) {
            response.headers.set_entry(*name, entry.clone());
        }
    }
    response
}

/// Build a reply from the request, an optional template and overrides.
///
/// The request's identifying headers win over the template; overrides win
/// over both.
pub fn build_response(
    request: &SipMessage,
    status: u16,
    reason: &str,
    template: Option<&SipMessage>,
    overrides: &MessageOverrides,
) -> Result<SipMessage> {
    if !request.is_request() {
        return Err(Error::InvalidFormat(
            "cannot reply to a response".to_string(),
        ));
    }
    let mut response = make_response(request, status, reason);
    if let Some(template) = template {
        let mut base = strip_template(template);
        if base.is_request() {
            return Err(Error::InvalidFormat(
                "reply template must be a response".to_string(),
            ));
        }
        for (name, entry) in response.headers.iter() {
            base.headers.set_entry(name.clone(), entry.clone());
        }
        base.start_line = response.start_line;
        base.version = response.version;
        response = base;
    }
    overrides.apply_to(&mut response)?;
    Ok(response)
}

/// To tag for a reply, derived from the request so retransmitted replies to
/// the same request carry the same tag.
pub fn derive_reply_tag(request: &SipMessage) -> String {
    let mut hasher = Md5::new();
    hasher.update(request.call_id().unwrap_or_default());
    hasher.update(b"|");
    hasher.update(request.from_tag().unwrap_or_default());
    hasher.update(b"|");
    if let Some(cseq) = request.cseq() {
        hasher.update(cseq.to_string());
    }
    hasher.update(b"|");
    hasher.update(request.branch().unwrap_or_default());
    let digest = hasher.finalize();
    digest[..5].iter().map(|b| format!("{:02x}", b)).collect()
}
