//! Commands emitted by the synchronizer and the result of one pass.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::error::SyncError;
use super::state::SyncStatus;
use crate::model::{DeclarationId, NodeRef, SourceLocation, Surface};

/// What a surface should reveal and select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// A node of the results tree.
    Node { node: NodeRef },
    /// A declaration in the outline of `file`.
    Declaration {
        file: PathBuf,
        declaration: DeclarationId,
    },
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { node } => write!(f, "{}", node),
            Self::Declaration { file, declaration } => {
                write!(f, "{} in {}", declaration, file.display())
            }
        }
    }
}

/// Instruction for one surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Open `location` and select its selection span.
    Open {
        surface: Surface,
        location: SourceLocation,
    },
    /// Scroll to `target` and make it the selection.
    RevealAndSelect { surface: Surface, target: Target },
}

impl Command {
    pub fn surface(&self) -> Surface {
        match self {
            Self::Open { surface, .. } | Self::RevealAndSelect { surface, .. } => *surface,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { surface, location } => write!(
                f,
                "open {}:{} in {}",
                location.file.display(),
                location.line,
                surface
            ),
            Self::RevealAndSelect { surface, target } => {
                write!(f, "select {} in {}", target, surface)
            }
        }
    }
}

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Commands for the dispatcher, in order.
    pub commands: Vec<Command>,
    /// Status after the pass.
    pub status: SyncStatus,
    /// Recoverable problems met during the pass.
    pub errors: Vec<SyncError>,
}

impl Transition {
    pub fn is_quiet(&self) -> bool {
        self.commands.is_empty()
    }
}
