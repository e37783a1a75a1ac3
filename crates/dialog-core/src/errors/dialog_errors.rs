use thiserror::Error;

use crate::transport::TransportError;

/// Result type for engine operations
pub type DialogResult<T> = Result<T, DialogError>;

/// Errors returned by the engine API
///
/// ## Error Categories
///
/// - **Configuration**: missing endpoint options, or a request that cannot
///   be built from the given template and overrides
/// - **Lookup**: unknown endpoint or dialog identifiers
/// - **Protocol**: messages that cannot play the role they were given
/// - **Transport**: the transport collaborator refused the operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialogError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Endpoint not found: {id}")]
    EndpointNotFound { id: String },

    #[error("Dialog not found: {id}")]
    DialogNotFound { id: String },

    #[error("Invalid dialog state: dialog {id} is {state}, cannot {operation}")]
    InvalidState {
        id: String,
        state: String,
        operation: String,
    },

    #[error("Protocol violation: {message}")]
    ProtocolViolation { message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("SIP error: {0}")]
    Sip(#[from] sipprobe_sip_core::Error),
}

impl DialogError {
    pub fn configuration(message: impl Into<String>) -> Self {
        DialogError::Configuration {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        DialogError::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Map a message-building failure: missing inputs are configuration
    /// problems, anything else stays a SIP error.
    pub(crate) fn from_build(err: sipprobe_sip_core::Error) -> Self {
        match err {
            sipprobe_sip_core::Error::MissingField(field) => {
                DialogError::configuration(format!("missing {}", field))
            }
            other => DialogError::Sip(other),
        }
    }
}
