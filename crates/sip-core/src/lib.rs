//! # sipprobe SIP core
//!
//! Message-level building blocks for the sipprobe user-agent engine:
//!
//! - [`types`]: the message representation ([`SipMessage`], [`Headers`],
//!   [`NameAddr`], [`Via`], [`SipUri`]);
//! - [`parser`]: the nom based wire codec;
//! - [`view`]: the Message Model, memoized pseudo-variable accessors over a
//!   message ([`MessageView`]);
//! - [`matching`]: declarative matchers built on the Message Model;
//! - [`builder`]: typed construction of outbound requests and replies;
//! - [`auth`]: digest authentication.
//!
//! ```rust
//! use sipprobe_sip_core::prelude::*;
//!
//! let msg = SipMessage::parse(
//!     "OPTIONS sip:bob@B SIP/2.0\r\nf: <sip:ada@test1.com>;tag=1\r\ni: x\r\nCSeq: 1 OPTIONS\r\n\r\n",
//! )
//! .unwrap();
//! let matcher = build_matcher([("$rm", Expect::from("OPTIONS")), ("$ft", Expect::from("1"))]);
//! assert!(matcher.matches(&msg));
//! ```

pub mod auth;
pub mod builder;
pub mod error;
pub mod matching;
pub mod parser;
pub mod types;
pub mod view;

pub use auth::{ChallengeParams, Credentials, DigestAuthenticator, Md5Digest};
pub use builder::{build_request, build_response, make_response, MessageOverrides};
pub use error::{Error, Result};
pub use matching::{build_matcher, Expect, MatchError, SipMatcher};
pub use parser::parse_message;
pub use types::{
    AuthParams, CSeq, HeaderEntry, HeaderName, HeaderValue, Headers, Method, NameAddr, Param,
    Params, SipMessage, SipUri, StartLine, Via,
};
pub use view::{FieldValue, MessageView};

/// Re-export of common types and functions
pub mod prelude {
    pub use super::{
        build_matcher, build_request, build_response, make_response, Credentials, Error, Expect,
        FieldValue, HeaderName, HeaderValue, MessageOverrides, MessageView, Method, NameAddr,
        Result, SipMatcher, SipMessage, SipUri,
    };
}
