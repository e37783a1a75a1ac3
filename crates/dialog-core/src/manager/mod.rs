//! Engine module
//!
//! The [`Engine`] is the single owner of endpoints and dialogs. Its
//! operations are split by concern:
//!
//! - [`core`]: tables, endpoint lifecycle, dialog lookup and retirement
//! - `classification`: inbound requests to events
//! - `dialog_operations`: outbound requests and replies
//! - `response_lifecycle`: responses to our requests

pub mod core;

mod classification;
mod dialog_operations;
mod response_lifecycle;

pub use self::core::Engine;
pub use dialog_operations::{Reply, SignRequest};
