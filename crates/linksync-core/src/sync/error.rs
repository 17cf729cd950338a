//! Recoverable synchronization errors.

use thiserror::Error;

use crate::model::Surface;

/// Problems reported in a [`Transition`](super::Transition).
///
/// None of them stop the synchronizer; each degrades the status to broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A node could not be mapped to source, or the reverse.
    #[error("cannot resolve {qualified_name} to source")]
    ResolutionMiss { qualified_name: String },

    /// An event referenced a node of an older tree whose name is gone.
    #[error("event refers to tree generation {event_generation}, current is {current_generation}")]
    StaleTree {
        event_generation: u64,
        current_generation: u64,
    },

    /// A surface rejected a command.
    #[error("{surface} rejected command: {reason}")]
    CommandFailed { surface: Surface, reason: String },
}
