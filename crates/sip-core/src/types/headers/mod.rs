//! # SIP Headers
//!
//! A message's headers are an insertion-ordered map from [`HeaderName`] to
//! either one structured value or an ordered list of values:
//!
//! ```text
//! Via: SIP/2.0/UDP a;branch=z9hG4bK1      -> List([Via, Via])
//! Via: SIP/2.0/UDP b;branch=z9hG4bK2
//! From: <sip:ada@test1.com>;tag=1         -> Single(Address)
//! ```
//!
//! Headers listed in [`HeaderName::is_list`] are always lists. Any other
//! header is promoted to a list when it appears more than once.

mod header_name;
mod header_value;

use std::slice;

use serde::{Deserialize, Serialize};

pub use header_name::{expand_compact, HeaderName};
pub use header_value::{AuthParams, CSeq, HeaderValue};

use crate::types::address::NameAddr;

/// Value(s) stored under one header name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderEntry {
    Single(HeaderValue),
    List(Vec<HeaderValue>),
}

impl HeaderEntry {
    /// All values in wire order
    pub fn values(&self) -> &[HeaderValue] {
        match self {
            HeaderEntry::Single(value) => slice::from_ref(value),
            HeaderEntry::List(values) => values,
        }
    }

    pub fn values_mut(&mut self) -> &mut [HeaderValue] {
        match self {
            HeaderEntry::Single(value) => slice::from_mut(value),
            HeaderEntry::List(values) => values,
        }
    }

    pub fn first(&self) -> Option<&HeaderValue> {
        self.values().first()
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }
}

/// Ordered header map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    entries: Vec<(HeaderName, HeaderEntry)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderEntry)> {
        self.entries.iter().map(|(name, entry)| (name, entry))
    }

    fn position(&self, name: &HeaderName) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&HeaderEntry> {
        let name = HeaderName::new(name);
        self.position(&name).map(|i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut HeaderEntry> {
        let name = HeaderName::new(name);
        let index = self.position(&name)?;
        Some(&mut self.entries[index].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All values of a header; empty when absent
    pub fn values(&self, name: &str) -> &[HeaderValue] {
        self.get(name).map(HeaderEntry::values).unwrap_or(&[])
    }

    pub fn first(&self, name: &str) -> Option<&HeaderValue> {
        self.get(name).and_then(HeaderEntry::first)
    }

    /// Append one value, promoting a repeated single header to a list
    pub fn append(&mut self, name: impl Into<HeaderName>, value: HeaderValue) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => {
                let entry = &mut self.entries[index].1;
                match entry {
                    HeaderEntry::List(values) => values.push(value),
                    HeaderEntry::Single(existing) => {
                        let first = existing.clone();
                        *entry = HeaderEntry::List(vec![first, value]);
                    }
                }
            }
            None => {
                let entry = if name.is_list() {
                    HeaderEntry::List(vec![value])
                } else {
                    HeaderEntry::Single(value)
                };
                self.entries.push((name, entry));
            }
        }
    }

    /// Replace a header with exactly one value, keeping its position
    pub fn set(&mut self, name: impl Into<HeaderName>, value: HeaderValue) {
        let name = name.into();
        let entry = if name.is_list() {
            HeaderEntry::List(vec![value])
        } else {
            HeaderEntry::Single(value)
        };
        self.set_entry(name, entry);
    }

    /// Replace a header with a list of values; an empty list removes it
    pub fn set_list(&mut self, name: impl Into<HeaderName>, values: Vec<HeaderValue>) {
        let name = name.into();
        if values.is_empty() {
            self.remove(name.as_str());
            return;
        }
        self.set_entry(name, HeaderEntry::List(values));
    }

    pub fn set_entry(&mut self, name: impl Into<HeaderName>, entry: HeaderEntry) {
        let name = name.into();
        match self.position(&name) {
            Some(index) => self.entries[index].1 = entry,
            None => self.entries.push((name, entry)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderEntry> {
        let name = HeaderName::new(name);
        let index = self.position(&name)?;
        Some(self.entries.remove(index).1)
    }

    /// First value rendered as text
    pub fn text(&self, name: &str) -> Option<String> {
        self.first(name).map(ToString::to_string)
    }

    pub fn address(&self, name: &str) -> Option<&NameAddr> {
        self.first(name).and_then(HeaderValue::as_address)
    }

    pub fn address_mut(&mut self, name: &str) -> Option<&mut NameAddr> {
        self.get_mut(name)
            .and_then(|entry| entry.values_mut().first_mut())
            .and_then(HeaderValue::as_address_mut)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.first("call-id")
            .and_then(HeaderValue::as_text)
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn cseq(&self) -> Option<&CSeq> {
        self.first("cseq").and_then(HeaderValue::as_cseq)
    }

    pub fn from(&self) -> Option<&NameAddr> {
        self.address("from")
    }

    pub fn to(&self) -> Option<&NameAddr> {
        self.address("to")
    }
}
