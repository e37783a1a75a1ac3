//! # Pattern Matcher
//!
//! [`build_matcher`] turns a table of expected values into a predicate over
//! SIP messages. Keys are anything a [`MessageView`] resolves (`$rm`,
//! `$(hdr(Via)[0])`, `hdr_subject`, ...); all keys must match.
//!
//! The table is flat, one entry per key. There is no nested template form:
//! header parts, list items and parameters are addressed by their own keys
//! (`$(hdr(Route)[1])`, `$ft`), and a failure reports `sip_msg.<key>`.
//!
//! ```rust
//! use sipprobe_sip_core::matching::{build_matcher, Expect};
//! use sipprobe_sip_core::SipMessage;
//!
//! let invite = SipMessage::parse(
//!     "INVITE sip:bob@B SIP/2.0\r\nFrom: <sip:ada@test1.com>\r\nCSeq: 1 INVITE\r\n\r\n",
//! )
//! .unwrap();
//! let matcher = build_matcher([
//!     ("$rm", Expect::from("INVITE")),
//!     ("$fU", Expect::pattern("^a").unwrap()),
//!     ("$hdr(Subject)", Expect::Absent),
//! ]);
//! assert!(matcher.matches(&invite));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::types::sip_message::SipMessage;
use crate::view::{FieldValue, MessageView};

type PredicateFn = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// Expected value for one key
#[derive(Clone)]
pub enum Expect {
    /// Equal after rendering both sides as text
    Literal(FieldValue),
    /// Regular expression over the text form
    Pattern(Regex),
    /// The key must not resolve
    Absent,
    /// The key must resolve; its value is recorded under the given name
    Capture(String),
    /// Custom test over the resolved value
    Predicate(PredicateFn),
}

impl Expect {
    pub fn pattern(re: &str) -> Result<Self, regex::Error> {
        Regex::new(re).map(Expect::Pattern)
    }

    pub fn capture(name: impl Into<String>) -> Self {
        Expect::Capture(name.into())
    }

    pub fn predicate(f: impl Fn(&FieldValue) -> bool + Send + Sync + 'static) -> Self {
        Expect::Predicate(Arc::new(f))
    }

    fn test(&self, actual: Option<&FieldValue>) -> bool {
        match (self, actual) {
            (Expect::Absent, actual) => actual.is_none(),
            (_, None) => false,
            (Expect::Literal(expected), Some(actual)) => expected.to_string() == actual.to_string(),
            (Expect::Pattern(re), Some(actual)) => re.is_match(&actual.to_string()),
            (Expect::Capture(_), Some(_)) => true,
            (Expect::Predicate(f), Some(actual)) => f(actual),
        }
    }
}

impl fmt::Debug for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Literal(value) => write!(f, "{:?}", value.to_string()),
            Expect::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Expect::Absent => f.write_str("absent"),
            Expect::Capture(name) => write!(f, "capture({})", name),
            Expect::Predicate(_) => f.write_str("<predicate>"),
        }
    }
}

impl From<&str> for Expect {
    fn from(text: &str) -> Self {
        Expect::Literal(FieldValue::from(text))
    }
}

impl From<String> for Expect {
    fn from(text: String) -> Self {
        Expect::Literal(FieldValue::from(text))
    }
}

impl From<i64> for Expect {
    fn from(n: i64) -> Self {
        Expect::Literal(FieldValue::Integer(n))
    }
}

impl From<Regex> for Expect {
    fn from(re: Regex) -> Self {
        Expect::Pattern(re)
    }
}

/// Mismatch reported by [`SipMatcher::check`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{path}: expected {expected}, got {actual}")]
pub struct MatchError {
    /// `sip_msg.<key>`
    pub path: String,
    pub expected: String,
    pub actual: String,
}

/// Values recorded by [`Expect::Capture`] keys
pub type Captures = HashMap<String, FieldValue>;

#[derive(Debug, Clone)]
pub struct SipMatcher {
    expected: Vec<(String, Expect)>,
}

/// Build a matcher from `(key, expected)` pairs
pub fn build_matcher<K, I>(expected: I) -> SipMatcher
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Expect)>,
{
    SipMatcher {
        expected: expected.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    }
}

impl SipMatcher {
    /// Boolean mode; stops at the first failing key
    pub fn matches(&self, msg: &SipMessage) -> bool {
        self.matches_view(&MessageView::new(msg))
    }

    pub fn matches_view(&self, view: &MessageView<'_>) -> bool {
        self.expected
            .iter()
            .all(|(key, expect)| expect.test(view.get(key).as_ref()))
    }

    /// Assertive mode; returns captured values on success
    pub fn check(&self, msg: &SipMessage) -> Result<Captures, MatchError> {
        self.check_view(&MessageView::new(msg))
    }

    pub fn check_view(&self, view: &MessageView<'_>) -> Result<Captures, MatchError> {
        let mut captures = Captures::new();
        for (key, expect) in &self.expected {
            let actual = view.get(key);
            if !expect.test(actual.as_ref()) {
                return Err(MatchError {
                    path: format!("sip_msg.{}", key),
                    expected: format!("{:?}", expect),
                    actual: match &actual {
                        Some(value) => format!("{:?}", value.to_string()),
                        None => "absent".to_string(),
                    },
                });
            }
            if let (Expect::Capture(name), Some(value)) = (expect, actual) {
                captures.insert(name.clone(), value);
            }
        }
        Ok(captures)
    }
}
