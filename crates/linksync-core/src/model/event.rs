//! Selection events exchanged over the bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::location::{DeclarationId, TextRange};
use super::tree::NodeId;

/// An observable view taking part in linking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    ResultsTree,
    Editor,
    Outline,
    Browser,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ResultsTree => "results tree",
            Self::Editor => "editor",
            Self::Outline => "outline",
            Self::Browser => "browser",
        };
        f.write_str(name)
    }
}

/// Who caused an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Direct user navigation.
    User,
    /// The test runner, e.g. auto-selecting the first failure.
    Runner,
    /// A surface reporting a selection the dispatcher just applied.
    Dispatcher,
}

/// Reference to a test node that survives arena replacement checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Generation of the tree that issued `id`.
    pub generation: u64,
    pub id: NodeId,
    /// Used to re-map the reference when the tree was rebuilt.
    pub qualified_name: String,
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.qualified_name, self.generation)
    }
}

/// What happened on a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A node was selected in the results tree.
    TreeSelection { node: NodeRef },
    /// The caret moved or text was selected in the active editor.
    EditorCaret { file: PathBuf, range: TextRange },
    /// An editor became active without a selection change.
    EditorActivated {
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caret: Option<TextRange>,
    },
    /// An editor was closed.
    EditorClosed { file: PathBuf },
    /// A declaration was selected in the outline of `file`.
    OutlineSelection { file: PathBuf, declaration: DeclarationId },
    /// A file, or a member inside it, was selected in the project browser.
    BrowserSelection {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        member: Option<DeclarationId>,
    },
}

impl EventPayload {
    /// Surface the event originates from.
    pub fn surface(&self) -> Surface {
        match self {
            Self::TreeSelection { .. } => Surface::ResultsTree,
            Self::EditorCaret { .. } | Self::EditorActivated { .. } | Self::EditorClosed { .. } => {
                Surface::Editor
            }
            Self::OutlineSelection { .. } => Surface::Outline,
            Self::BrowserSelection { .. } => Surface::Browser,
        }
    }
}

/// A published event, stamped by the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEvent {
    /// Strictly increasing per bus.
    pub seq: u64,
    pub provenance: Provenance,
    pub payload: EventPayload,
}
