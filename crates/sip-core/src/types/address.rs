//! Name-addr values (`"Display" <uri>;params`)
//!
//! Used by From, To, Contact, Route, Record-Route and the identity headers.
//! The URI is kept verbatim; [`NameAddr::sip_uri`] splits it when needed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::param::Params;
use crate::types::uri::SipUri;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAddr {
    /// Display name without surrounding quotes
    pub display_name: Option<String>,
    /// URI text exactly as carried on the wire
    pub uri: String,
    /// Header parameters (`tag`, `expires`, ...)
    pub params: Params,
}

impl NameAddr {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            display_name: None,
            uri: uri.into(),
            params: Params::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.set_tag(Some(tag.into()));
        self
    }

    pub fn tag(&self) -> Option<&str> {
        self.params.value("tag")
    }

    /// Set or clear the `tag` parameter
    pub fn set_tag(&mut self, tag: Option<String>) {
        match tag {
            Some(tag) => self.params.set("tag", Some(tag)),
            None => {
                self.params.remove("tag");
            }
        }
    }

    /// Same address with the `tag` parameter removed
    pub fn without_tag(&self) -> Self {
        let mut copy = self.clone();
        copy.set_tag(None);
        copy
    }

    pub fn sip_uri(&self) -> Result<SipUri> {
        SipUri::parse(&self.uri)
    }
}

impl fmt::Display for NameAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.display_name {
            write!(f, "\"{}\" ", name.replace('"', "\\\""))?;
        }
        write!(f, "<{}>{}", self.uri, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_name_and_tag() {
        let addr = NameAddr::new("sip:ada@test1.com")
            .with_display_name("Ada")
            .with_tag("1234");
        assert_eq!(addr.to_string(), "\"Ada\" <sip:ada@test1.com>;tag=1234");
        assert_eq!(addr.tag(), Some("1234"));
        assert_eq!(addr.without_tag().to_string(), "\"Ada\" <sip:ada@test1.com>");
    }

    #[test]
    fn test_sip_uri_split() {
        let addr = NameAddr::new("sip:bob@example.org:5080");
        let uri = addr.sip_uri().unwrap();
        assert_eq!(uri.user.as_deref(), Some("bob"));
        assert_eq!(uri.port, Some(5080));
    }
}
