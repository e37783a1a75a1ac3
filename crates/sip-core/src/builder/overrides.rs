use crate::error::{Error, Result};
use crate::parser::parse_header_value;
use crate::types::address::NameAddr;
use crate::types::headers::{CSeq, HeaderName, HeaderValue};
use crate::types::method::Method;
use crate::types::param::Params;
use crate::types::sip_message::{SipMessage, StartLine};

/// Key-wise patch for a name-addr header (From, To, Contact, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPatch {
    pub display_name: Option<String>,
    pub uri: Option<String>,
    /// Merged into the existing parameters key by key
    pub params: Params,
}

impl AddressPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn param(mut self, name: &str, value: Option<&str>) -> Self {
        self.params.set(name, value.map(str::to_string));
        self
    }

    fn merge_into(&self, addr: &mut NameAddr) {
        if let Some(name) = &self.display_name {
            addr.display_name = Some(name.clone());
        }
        if let Some(uri) = &self.uri {
            addr.uri = uri.clone();
        }
        addr.params.merge(&self.params);
    }

    fn into_address(self) -> Option<NameAddr> {
        let uri = self.uri?;
        Some(NameAddr {
            display_name: self.display_name,
            uri,
            params: self.params,
        })
    }
}

/// One header change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderPatch {
    /// Raw text, parsed into its structured form; replaces the header
    Text(String),
    /// Merge into the existing name-addr key by key
    Address(AddressPatch),
    /// Merge into the existing CSeq field by field
    CSeq {
        seq: Option<u32>,
        method: Option<Method>,
    },
    /// Replace the header with one structured value
    Value(HeaderValue),
    /// Replace the whole value list
    List(Vec<HeaderValue>),
    Remove,
}

/// Caller overrides for an outbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOverrides {
    pub method: Option<Method>,
    pub uri: Option<String>,
    pub status: Option<u16>,
    pub reason: Option<String>,
    pub body: Option<String>,
    /// Applied in order
    pub headers: Vec<(HeaderName, HeaderPatch)>,
}

impl MessageOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn status(mut self, status: u16, reason: impl Into<String>) -> Self {
        self.status = Some(status);
        self.reason = Some(reason.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn patch(mut self, name: &str, patch: HeaderPatch) -> Self {
        self.headers.push((HeaderName::new(name), patch));
        self
    }

    /// Set a header from its text form
    pub fn header(self, name: &str, value: impl Into<String>) -> Self {
        self.patch(name, HeaderPatch::Text(value.into()))
    }

    pub fn header_value(self, name: &str, value: impl Into<HeaderValue>) -> Self {
        self.patch(name, HeaderPatch::Value(value.into()))
    }

    pub fn header_list(self, name: &str, values: Vec<HeaderValue>) -> Self {
        self.patch(name, HeaderPatch::List(values))
    }

    pub fn remove_header(self, name: &str) -> Self {
        self.patch(name, HeaderPatch::Remove)
    }

    pub fn from(self, addr: NameAddr) -> Self {
        self.header_value("from", addr)
    }

    pub fn to(self, addr: NameAddr) -> Self {
        self.header_value("to", addr)
    }

    pub fn call_id(self, call_id: impl Into<String>) -> Self {
        self.header("call-id", call_id)
    }

    pub fn cseq(self, seq: u32) -> Self {
        self.patch(
            "cseq",
            HeaderPatch::CSeq {
                seq: Some(seq),
                method: None,
            },
        )
    }

    /// Whether the overrides give `name` a value (removals do not count)
    pub fn sets_header(&self, name: &str) -> bool {
        let name = HeaderName::new(name);
        self.headers
            .iter()
            .any(|(n, patch)| *n == name && *patch != HeaderPatch::Remove)
    }

    /// CSeq number requested by these overrides, if any
    pub fn cseq_seq(&self) -> Option<u32> {
        self.headers
            .iter()
            .rev()
            .filter(|(name, _)| name.as_str() == "cseq")
            .find_map(|(_, patch)| match patch {
                HeaderPatch::CSeq { seq, .. } => *seq,
                HeaderPatch::Value(value) => value.as_cseq().map(|c| c.seq),
                HeaderPatch::Text(text) => text.split_whitespace().next()?.parse().ok(),
                _ => None,
            })
    }

    /// Apply every override to `msg`
    pub fn apply_to(&self, msg: &mut SipMessage) -> Result<()> {
        match &mut msg.start_line {
            StartLine::Request { method, uri } => {
                if self.status.is_some() {
                    return Err(Error::InvalidFormat(
                        "status override on a request".to_string(),
                    ));
                }
                if let Some(m) = &self.method {
                    *method = m.clone();
                }
                if let Some(u) = &self.uri {
                    *uri = u.clone();
                }
            }
            StartLine::Response { status, reason } => {
                if self.method.is_some() || self.uri.is_some() {
                    return Err(Error::InvalidFormat(
                        "method or uri override on a response".to_string(),
                    ));
                }
                if let Some(s) = self.status {
                    *status = s;
                }
                if let Some(r) = &self.reason {
                    *reason = r.clone();
                }
            }
        }
        if let Some(body) = &self.body {
            msg.body = body.clone();
        }
        for (name, patch) in &self.headers {
            apply_patch(msg, name, patch)?;
        }
        Ok(())
    }
}

fn apply_patch(msg: &mut SipMessage, name: &HeaderName, patch: &HeaderPatch) -> Result<()> {
    let request_method = msg.method().cloned();
    let headers = &mut msg.headers;
    match patch {
        HeaderPatch::Text(text) => {
            let values = parse_header_value(name, text);
            if name.is_list() || values.len() > 1 {
                headers.set_list(name.clone(), values);
            } else if let Some(value) = values.into_iter().next() {
                headers.set(name.clone(), value);
            }
        }
        HeaderPatch::Address(addr_patch) => match headers.address_mut(name.as_str()) {
            Some(existing) => addr_patch.merge_into(existing),
            None => {
                let addr = addr_patch
                    .clone()
                    .into_address()
                    .ok_or_else(|| Error::MissingField(format!("{} uri", name)))?;
                headers.set(name.clone(), HeaderValue::Address(addr));
            }
        },
        HeaderPatch::CSeq { seq, method } => {
            let current = headers.cseq().cloned();
            let seq = seq
                .or_else(|| current.as_ref().map(|c| c.seq))
                .ok_or_else(|| Error::MissingField("CSeq number".to_string()))?;
            let method = method
                .clone()
                .or_else(|| current.map(|c| c.method))
                .or(request_method)
                .ok_or_else(|| Error::MissingField("CSeq method".to_string()))?;
            headers.set("cseq", HeaderValue::CSeq(CSeq::new(seq, method)));
        }
        HeaderPatch::Value(value) => headers.set(name.clone(), value.clone()),
        HeaderPatch::List(values) => headers.set_list(name.clone(), values.clone()),
        HeaderPatch::Remove => {
            headers.remove(name.as_str());
        }
    }
    Ok(())
}
