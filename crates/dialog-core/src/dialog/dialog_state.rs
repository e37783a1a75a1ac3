use std::fmt;

use serde::{Deserialize, Serialize};

/// Dialog lifecycle
///
/// ```text
/// Offering ──2xx to the defining request──► Answered
///     │                                        │
///     └──────────── terminate ──────────► Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogState {
    /// Defining INVITE/SUBSCRIBE sent or received, no 2xx yet
    Offering,
    /// A 2xx to the defining request was sent or received
    Answered,
    /// Terminated by the owner; still readable until retired
    Terminated,
}

impl fmt::Display for DialogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialogState::Offering => "offering",
            DialogState::Answered => "answered",
            DialogState::Terminated => "terminated",
        })
    }
}

/// Which side sent the defining request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        })
    }
}
