//! # SIP Wire Parser
//!
//! nom based parsers for the text form of SIP messages. [`parse_message`]
//! is the entry point; the submodules parse the structured header values
//! the engine reasons about (addresses, Via, CSeq, auth parameters) and
//! the URIs inside them.

pub mod address;
pub mod auth;
pub mod message;
pub mod param;
pub mod uri;
pub mod utils;
pub mod via;

pub use message::{parse_header_value, parse_message};

// Type alias for parser result
pub(crate) type ParseResult<'a, O> = nom::IResult<&'a str, O>;
