//! Core dialog types
//!
//! - [`DialogId`], [`EndpointId`]: opaque identifiers handed out by the engine
//! - [`Dialog`]: per-dialog protocol state (tags, sequence numbers, remote
//!   target, route set)
//! - [`DialogState`]: `offering → answered`, plus `terminated`
//!
//! ## Lifecycle
//!
//! ```text
//! outgoing:  create ──INVITE──►  offering ──2xx received──► answered
//! incoming:  INVITE received ──► offering ──2xx sent──────► answered
//! ```
//!
//! Dialogs are created and mutated only through the
//! [`Engine`](crate::manager::Engine); callers get snapshots.

pub mod dialog_id;
pub mod dialog_impl;
pub mod dialog_state;

pub use dialog_id::{DialogId, EndpointId};
pub use dialog_impl::Dialog;
pub use dialog_state::{DialogState, Direction};
