//! Generic header selectors
//!
//! ```text
//! $hdr(Name)                 first value
//! $(hdr(Name)[idx])          idx = 0..n | -1 | last | first | * | all
//! $(hdrcnt(Name))            number of values, 0 when absent
//! hdr_name_with_underscores  first value of Name-With-Underscores
//! ```
//!
//! Header names resolve through [`HeaderName`], so compact forms and any
//! capitalization select the same header.

use crate::types::headers::HeaderName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderIndex {
    First,
    Last,
    At(usize),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Header { name: HeaderName, index: HeaderIndex },
    Count { name: HeaderName },
}

fn header_name(raw: &str) -> Option<HeaderName> {
    let raw = raw.trim();
    if raw.is_empty() || raw.contains(['(', ')', '[', ']']) {
        return None;
    }
    Some(HeaderName::new(raw))
}

fn index(raw: &str) -> Option<HeaderIndex> {
    match raw.trim() {
        "-1" | "last" => Some(HeaderIndex::Last),
        "first" => Some(HeaderIndex::First),
        "*" | "all" => Some(HeaderIndex::All),
        digits => digits.parse().ok().map(HeaderIndex::At),
    }
}

impl Selector {
    /// Parse a generic header key; `None` when `key` uses none of the forms
    pub fn parse(key: &str) -> Option<Selector> {
        if let Some(rest) = key.strip_prefix("hdr_") {
            return header_name(&rest.replace('_', "-")).map(|name| Selector::Header {
                name,
                index: HeaderIndex::First,
            });
        }
        if let Some(inner) = key.strip_prefix("$hdr(").and_then(|k| k.strip_suffix(')')) {
            return header_name(inner).map(|name| Selector::Header {
                name,
                index: HeaderIndex::First,
            });
        }
        if let Some(inner) = key.strip_prefix("$(hdrcnt(").and_then(|k| k.strip_suffix("))")) {
            return header_name(inner).map(|name| Selector::Count { name });
        }
        let inner = key.strip_prefix("$(hdr(")?.strip_suffix("])")?;
        let (name, idx) = inner.split_once(")[")?;
        Some(Selector::Header {
            name: header_name(name)?,
            index: index(idx)?,
        })
    }
}
