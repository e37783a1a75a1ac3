//! # Message Model
//!
//! [`MessageView`] wraps a [`SipMessage`] and exposes named fields modelled
//! on SIP scripting pseudo-variables (`$fU`, `$ru`, `$auth.nonce`, ...) plus
//! a generic header syntax (see [`selector`]).
//!
//! Resolution order for a key:
//!
//! 1. the per-view cache;
//! 2. the accessor table ([`accessors::ACCESSORS`]);
//! 3. generic header selectors.
//!
//! Derived fields that need a sub-parse (URI split, lazily parsed identity
//! headers) parse once and keep the result alongside the message. A field
//! that cannot be resolved is `None`, which is distinct from an empty
//! string; reads never fail.
//!
//! ```rust
//! use sipprobe_sip_core::{FieldValue, MessageView};
//!
//! let view = MessageView::parse(
//!     "INVITE sip:bob@B SIP/2.0\r\n\
//!      f: <sip:ada@test1.com>;tag=1\r\n\
//!      t: <sip:bob@B>\r\n\
//!      i: c1\r\n\
//!      CSeq: 1 INVITE\r\n\r\n",
//! )
//! .unwrap();
//! assert_eq!(view.text("$rm").as_deref(), Some("INVITE"));
//! assert_eq!(view.text("$fU").as_deref(), Some("ada"));
//! assert_eq!(view.get("$cs"), Some(FieldValue::Integer(1)));
//! assert_eq!(view.get("$tt"), None);
//! assert_eq!(view.get("$(hdrcnt(Via))"), Some(FieldValue::Integer(0)));
//! ```

pub mod accessors;
pub mod selector;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::parser::address::parse_address;
use crate::parser::utils::split_list;
use crate::types::address::NameAddr;
use crate::types::headers::{HeaderName, HeaderValue};
use crate::types::sip_message::SipMessage;
use crate::types::uri::SipUri;
use selector::{HeaderIndex, Selector};

/// A resolved field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    /// Every value of a header, in order
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(text) => text.trim().parse().ok(),
            FieldValue::List(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

/// Source of a lazily split URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UriSource {
    RequestUri,
    Header(HeaderName),
}

/// Read-only, memoizing view over one message
pub struct MessageView<'a> {
    msg: Cow<'a, SipMessage>,
    raw_len: Option<usize>,
    fields: Mutex<HashMap<String, Option<FieldValue>>>,
    uris: Mutex<HashMap<UriSource, Option<SipUri>>>,
    addresses: Mutex<HashMap<HeaderName, Option<NameAddr>>>,
}

impl<'a> MessageView<'a> {
    pub fn new(msg: &'a SipMessage) -> Self {
        Self::from_cow(Cow::Borrowed(msg), None)
    }

    pub fn owned(msg: SipMessage) -> MessageView<'static> {
        MessageView::from_cow(Cow::Owned(msg), None)
    }

    /// Parse raw text; only a view built this way knows `$ml`
    pub fn parse(raw: &str) -> Result<MessageView<'static>> {
        let msg = SipMessage::parse(raw)?;
        Ok(MessageView::from_cow(Cow::Owned(msg), Some(raw.len())))
    }

    fn from_cow(msg: Cow<'a, SipMessage>, raw_len: Option<usize>) -> Self {
        Self {
            msg,
            raw_len,
            fields: Mutex::new(HashMap::new()),
            uris: Mutex::new(HashMap::new()),
            addresses: Mutex::new(HashMap::new()),
        }
    }

    pub fn message(&self) -> &SipMessage {
        &self.msg
    }

    pub fn into_message(self) -> SipMessage {
        self.msg.into_owned()
    }

    pub fn is_request(&self) -> bool {
        self.msg.is_request()
    }

    pub fn raw_len(&self) -> Option<usize> {
        self.raw_len
    }

    /// Resolve a field; `None` when it does not exist
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        if let Some(cached) = self.fields.lock().get(key) {
            return cached.clone();
        }
        let value = self.resolve(key);
        trace!(key, ?value, "resolved message field");
        self.fields.lock().insert(key.to_string(), value.clone());
        value
    }

    /// Resolve a field as its display string
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.to_string())
    }

    /// Number of memoized keys
    pub fn cached_fields(&self) -> usize {
        self.fields.lock().len()
    }

    fn resolve(&self, key: &str) -> Option<FieldValue> {
        if let Some(accessor) = accessors::lookup(key) {
            return accessor.resolve(self);
        }
        match Selector::parse(key)? {
            Selector::Count { name } => {
                Some(FieldValue::Integer(self.msg.headers.values(name.as_str()).len() as i64))
            }
            Selector::Header { name, index } => {
                let values = self.msg.headers.values(name.as_str());
                let pick = |value: Option<&HeaderValue>| value.map(|v| FieldValue::Text(v.to_string()));
                match index {
                    HeaderIndex::First => pick(values.first()),
                    HeaderIndex::Last => pick(values.last()),
                    HeaderIndex::At(i) => pick(values.get(i)),
                    HeaderIndex::All if values.is_empty() => None,
                    HeaderIndex::All => Some(FieldValue::List(
                        values.iter().map(ToString::to_string).collect(),
                    )),
                }
            }
        }
    }

    /// First value of a name-addr header, parsing text values on first use
    pub(crate) fn name_addr(&self, name: &str) -> Option<NameAddr> {
        let name = HeaderName::new(name);
        if let Some(cached) = self.addresses.lock().get(&name) {
            return cached.clone();
        }
        let parsed = match self.msg.headers.first(name.as_str()) {
            Some(HeaderValue::Address(addr)) => Some(addr.clone()),
            Some(HeaderValue::Text(text)) => split_list(text)
                .first()
                .and_then(|first| parse_address(first).ok()),
            _ => None,
        };
        self.addresses.lock().insert(name, parsed.clone());
        parsed
    }

    fn split_uri(&self, source: UriSource) -> Option<SipUri> {
        if let Some(cached) = self.uris.lock().get(&source) {
            return cached.clone();
        }
        let uri = match &source {
            UriSource::RequestUri => self.msg.uri().map(str::to_string),
            UriSource::Header(name) => self.name_addr(name.as_str()).map(|addr| addr.uri),
        };
        let parsed = uri.and_then(|uri| SipUri::parse(&uri).ok());
        self.uris.lock().insert(source, parsed.clone());
        parsed
    }

    pub(crate) fn header_uri(&self, name: &str) -> Option<SipUri> {
        self.split_uri(UriSource::Header(HeaderName::new(name)))
    }

    pub(crate) fn request_uri(&self) -> Option<SipUri> {
        self.split_uri(UriSource::RequestUri)
    }
}

impl<'a> From<&'a SipMessage> for MessageView<'a> {
    fn from(msg: &'a SipMessage) -> Self {
        MessageView::new(msg)
    }
}

impl From<SipMessage> for MessageView<'static> {
    fn from(msg: SipMessage) -> Self {
        MessageView::owned(msg)
    }
}

impl fmt::Debug for MessageView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageView")
            .field("msg", &self.msg)
            .field("raw_len", &self.raw_len)
            .finish()
    }
}
