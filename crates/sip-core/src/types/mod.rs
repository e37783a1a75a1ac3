//! Core SIP types shared by the codec, the Message Model and the engine

pub mod address;
pub mod headers;
pub mod method;
pub mod param;
pub mod sip_message;
pub mod uri;
pub mod via;

pub use address::NameAddr;
pub use headers::{AuthParams, CSeq, HeaderEntry, HeaderName, HeaderValue, Headers};
pub use method::Method;
pub use param::{Param, Params};
pub use sip_message::{SipMessage, StartLine, SIP_VERSION};
pub use uri::SipUri;
pub use via::{generate_branch, Via, BRANCH_MAGIC_COOKIE};
