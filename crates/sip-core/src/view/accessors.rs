//! Named accessor table
//!
//! Every pseudo-variable maps to one [`Accessor`]; the table is the single
//! place that defines which names exist and what they resolve to.

use super::{FieldValue, MessageView};
use crate::types::headers::HeaderValue;
use crate::types::uri::SipUri;

/// Part of a name-addr header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrPart {
    DisplayName,
    Uri,
    User,
    Host,
    UserLength,
    Param(&'static str),
}

/// Part of the split Request-URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriPart {
    Scheme,
    User,
    Host,
    Port,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// Part of a name-addr header (From, To, P-Asserted-Identity, ...)
    Address(&'static str, AddrPart),
    /// Parameter of the first Authorization (or Proxy-Authorization) value
    Auth(&'static str),
    CSeqNumber,
    /// CSeq method, falling back to the request method
    Method,
    RequestUri,
    RequestUriPart(UriPart),
    Version,
    Status,
    Reason,
    Body,
    /// First value of a plain header
    Header(&'static str),
    MessageLength,
    IsRequest,
    MessageType,
    MessageTypeCode,
}

pub const ACCESSORS: &[(&str, Accessor)] = &[
    ("$fn", Accessor::Address("from", AddrPart::DisplayName)),
    ("$fu", Accessor::Address("from", AddrPart::Uri)),
    ("$fU", Accessor::Address("from", AddrPart::User)),
    ("$fd", Accessor::Address("from", AddrPart::Host)),
    ("$ft", Accessor::Address("from", AddrPart::Param("tag"))),
    ("$fUl", Accessor::Address("from", AddrPart::UserLength)),
    ("$tn", Accessor::Address("to", AddrPart::DisplayName)),
    ("$tu", Accessor::Address("to", AddrPart::Uri)),
    ("$tU", Accessor::Address("to", AddrPart::User)),
    ("$td", Accessor::Address("to", AddrPart::Host)),
    ("$tt", Accessor::Address("to", AddrPart::Param("tag"))),
    ("$pn", Accessor::Address("p-preferred-identity", AddrPart::DisplayName)),
    ("$pu", Accessor::Address("p-preferred-identity", AddrPart::Uri)),
    ("$pU", Accessor::Address("p-preferred-identity", AddrPart::User)),
    ("$pd", Accessor::Address("p-preferred-identity", AddrPart::Host)),
    ("$ai", Accessor::Address("p-asserted-identity", AddrPart::Uri)),
    ("$di", Accessor::Address("diversion", AddrPart::Uri)),
    ("$dip", Accessor::Address("diversion", AddrPart::Param("privacy"))),
    ("$dir", Accessor::Address("diversion", AddrPart::Param("reason"))),
    ("$re", Accessor::Address("remote-party-id", AddrPart::Uri)),
    ("$rt", Accessor::Address("refer-to", AddrPart::Uri)),
    ("$adu", Accessor::Auth("uri")),
    ("$aa", Accessor::Auth("algorithm")),
    ("$ar", Accessor::Auth("realm")),
    ("$au", Accessor::Auth("user")),
    ("$ad", Accessor::Auth("domain")),
    ("$aU", Accessor::Auth("username")),
    ("$an", Accessor::Auth("nonce")),
    ("$auth.nonce", Accessor::Auth("nonce")),
    ("$auth.resp", Accessor::Auth("response")),
    ("$auth.opaque", Accessor::Auth("opaque")),
    ("$auth.alg", Accessor::Auth("algorithm")),
    ("$auth.qop", Accessor::Auth("qop")),
    ("$auth.nc", Accessor::Auth("nc")),
    ("$auth.realm", Accessor::Auth("realm")),
    ("$cs", Accessor::CSeqNumber),
    ("$rm", Accessor::Method),
    ("$ru", Accessor::RequestUri),
    ("$rv", Accessor::Version),
    ("$rz", Accessor::RequestUriPart(UriPart::Scheme)),
    ("$rU", Accessor::RequestUriPart(UriPart::User)),
    ("$rd", Accessor::RequestUriPart(UriPart::Host)),
    ("$rp", Accessor::RequestUriPart(UriPart::Port)),
    ("$rs", Accessor::Status),
    ("$rr", Accessor::Reason),
    ("$rb", Accessor::Body),
    ("$ua", Accessor::Header("user-agent")),
    ("$ci", Accessor::Header("call-id")),
    ("$cl", Accessor::Header("content-length")),
    ("$cT", Accessor::Header("content-type")),
    ("$ml", Accessor::MessageLength),
    ("$mt", Accessor::MessageTypeCode),
    ("$msg.is_request", Accessor::IsRequest),
    ("$msg.type", Accessor::MessageType),
];

pub fn lookup(key: &str) -> Option<Accessor> {
    ACCESSORS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, accessor)| *accessor)
}

/// Every accessor name, in table order
pub fn names() -> impl Iterator<Item = &'static str> {
    ACCESSORS.iter().map(|(name, _)| *name)
}

fn text(value: impl Into<String>) -> FieldValue {
    FieldValue::Text(value.into())
}

impl Accessor {
    pub(crate) fn resolve(self, view: &MessageView<'_>) -> Option<FieldValue> {
        let msg = view.message();
        match self {
            Accessor::Address(header, part) => resolve_address(view, header, part),
            Accessor::Auth(param) => resolve_auth(view, param),
            Accessor::CSeqNumber => msg.cseq().map(|cseq| FieldValue::Integer(cseq.seq.into())),
            Accessor::Method => msg
                .cseq()
                .map(|cseq| &cseq.method)
                .or_else(|| msg.method())
                .map(|method| text(method.as_str())),
            Accessor::RequestUri => msg.uri().map(text),
            Accessor::RequestUriPart(part) => {
                let uri = view.request_uri()?;
                match part {
                    UriPart::Scheme => Some(text(uri.scheme)),
                    UriPart::User => uri.user.map(text),
                    UriPart::Host => (!uri.host.is_empty()).then(|| text(uri.host)),
                    UriPart::Port => uri.port.map(|port| FieldValue::Integer(port.into())),
                }
            }
            Accessor::Version => Some(text(msg.version.as_str())),
            Accessor::Status => msg.status().map(|status| FieldValue::Integer(status.into())),
            Accessor::Reason => msg.reason().map(text),
            Accessor::Body => (!msg.body.is_empty()).then(|| text(msg.body.as_str())),
            Accessor::Header(name) => msg.headers.first(name).map(|value| text(value.to_string())),
            Accessor::MessageLength => view.raw_len().map(|len| FieldValue::Integer(len as i64)),
            Accessor::IsRequest => Some(FieldValue::Integer(i64::from(msg.is_request()))),
            Accessor::MessageType => Some(text(if msg.is_request() { "request" } else { "reply" })),
            Accessor::MessageTypeCode => Some(FieldValue::Integer(if msg.is_request() { 1 } else { 2 })),
        }
    }
}

fn resolve_address(view: &MessageView<'_>, header: &str, part: AddrPart) -> Option<FieldValue> {
    match part {
        AddrPart::DisplayName => view.name_addr(header)?.display_name.map(text),
        AddrPart::Uri => view.name_addr(header).map(|addr| text(addr.uri)),
        AddrPart::Param(name) => view
            .name_addr(header)?
            .params
            .value(name)
            .map(|value| text(crate::types::param::unquote(value))),
        AddrPart::User => view.header_uri(header).and_then(|uri| uri.user).map(text),
        AddrPart::Host => view
            .header_uri(header)
            .map(|uri: SipUri| uri.host)
            .filter(|host| !host.is_empty())
            .map(text),
        AddrPart::UserLength => view
            .header_uri(header)
            .and_then(|uri| uri.user)
            .map(|user| FieldValue::Integer(user.chars().count() as i64)),
    }
}

fn resolve_auth(view: &MessageView<'_>, param: &str) -> Option<FieldValue> {
    let headers = &view.message().headers;
    let auth = headers
        .first("authorization")
        .or_else(|| headers.first("proxy-authorization"))
        .and_then(HeaderValue::as_auth)?;
    match param {
        "user" | "domain" => {
            let username = auth.get("username")?;
            let mut split = username.splitn(2, '@');
            let user = split.next().filter(|u| !u.is_empty());
            let domain = split.next().filter(|d| !d.is_empty());
            let part = if param == "user" { user } else { domain };
            part.map(text)
        }
        _ => auth.get(param).map(text),
    }
}
