//! Error types for dialog-core
//!
//! Every engine operation returns [`DialogResult`]. Failures are reported
//! before any shared state is touched, so an `Err` never leaves a half-built
//! dialog or endpoint behind.

pub mod dialog_errors;

pub use dialog_errors::{DialogError, DialogResult};
