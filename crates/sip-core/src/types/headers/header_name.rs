use std::fmt;

use serde::{Deserialize, Serialize};

/// Compact header forms (RFC 3261 Section 7.3.3 and extensions)
const COMPACT_FORMS: &[(&str, &str)] = &[
    ("a", "accept-contact"),
    ("b", "referred-by"),
    ("c", "content-type"),
    ("d", "request-disposition"),
    ("e", "content-encoding"),
    ("f", "from"),
    ("i", "call-id"),
    ("j", "reject-contact"),
    ("k", "supported"),
    ("l", "content-length"),
    ("m", "contact"),
    ("n", "identity-info"),
    ("o", "event"),
    ("r", "refer-to"),
    ("s", "subject"),
    ("t", "to"),
    ("u", "allow-events"),
    ("v", "via"),
    ("x", "session-expires"),
    ("y", "identity"),
];

/// Headers that always hold an ordered list of values
const LIST_HEADERS: &[&str] = &[
    "via",
    "route",
    "record-route",
    "contact",
    "authorization",
    "proxy-authorization",
    "www-authenticate",
    "proxy-authenticate",
];

/// Wire spellings that title-casing would get wrong
const SPECIAL_SPELLINGS: &[(&str, &str)] = &[
    ("call-id", "Call-ID"),
    ("cseq", "CSeq"),
    ("www-authenticate", "WWW-Authenticate"),
    ("mime-version", "MIME-Version"),
    ("rack", "RAck"),
    ("rseq", "RSeq"),
    ("sip-etag", "SIP-ETag"),
    ("sip-if-match", "SIP-If-Match"),
    ("remote-party-id", "Remote-Party-ID"),
    ("p-asserted-identity", "P-Asserted-Identity"),
    ("p-preferred-identity", "P-Preferred-Identity"),
];

/// Normalized SIP header name
///
/// Header names are case-insensitive and may use a compact form; a
/// `HeaderName` always holds the lowercase long form, so `f`, `From` and
/// `FROM` all compare equal.
///
/// ```rust
/// use sipprobe_sip_core::HeaderName;
///
/// assert_eq!(HeaderName::new("f"), HeaderName::new("From"));
/// assert_eq!(HeaderName::new("i").as_str(), "call-id");
/// assert_eq!(HeaderName::new("call-id").to_string(), "Call-ID");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeaderName(String);

impl HeaderName {
    pub fn new(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match expand_compact(&lower) {
            Some(long) => HeaderName(long.to_string()),
            None => HeaderName(lower),
        }
    }

    /// Lowercase long form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether values of this header are always kept as a list
    pub fn is_list(&self) -> bool {
        LIST_HEADERS.contains(&self.0.as_str())
    }

    /// Canonical wire spelling, e.g. `Record-Route`
    pub fn wire_form(&self) -> String {
        if let Some((_, spelled)) = SPECIAL_SPELLINGS.iter().find(|(k, _)| *k == self.0) {
            return (*spelled).to_string();
        }
        self.0
            .split('-')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_form())
    }
}

impl From<&str> for HeaderName {
    fn from(name: &str) -> Self {
        HeaderName::new(name)
    }
}

impl From<String> for HeaderName {
    fn from(name: String) -> Self {
        HeaderName::new(&name)
    }
}

/// Long form for a compact header name
pub fn expand_compact(name: &str) -> Option<&'static str> {
    COMPACT_FORMS
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(name))
        .map(|(_, long)| *long)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_forms_normalize() {
        assert_eq!(HeaderName::new("v").as_str(), "via");
        assert_eq!(HeaderName::new("M").as_str(), "contact");
        assert_eq!(HeaderName::new("l").as_str(), "content-length");
        assert_eq!(HeaderName::new("X-Custom").as_str(), "x-custom");
    }

    #[test]
    fn test_wire_form() {
        assert_eq!(HeaderName::new("record-route").wire_form(), "Record-Route");
        assert_eq!(HeaderName::new("CSEQ").wire_form(), "CSeq");
        assert_eq!(HeaderName::new("www-authenticate").wire_form(), "WWW-Authenticate");
        assert_eq!(HeaderName::new("x-my-header").wire_form(), "X-My-Header");
    }

    #[test]
    fn test_list_headers() {
        assert!(HeaderName::new("Via").is_list());
        assert!(HeaderName::new("m").is_list());
        assert!(!HeaderName::new("Subject").is_list());
    }
}
