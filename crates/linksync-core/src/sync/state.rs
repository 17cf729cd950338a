//! Link and sync states, and the status rule.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::index::SymbolIndex;
use crate::locator::SourceLocator;
use crate::model::{NodeId, TestKind, TestTree};

/// Whether selections propagate between surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Enabled,
    Disabled,
}

impl LinkState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}

/// Whether the active editor matches the selected test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Broken,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced => f.write_str("synced"),
            Self::Broken => f.write_str("broken"),
        }
    }
}

/// Status of an (active file, selected node) pairing.
///
/// Synced when nothing is selected, no editor is active, the selected node
/// resolves into the active file, or the selected node is a suite containing
/// a class declared in the active file. Broken otherwise.
///
/// Only the location cache changes, so calling this twice in a row yields
/// the same answer.
pub fn compute_status<I: SymbolIndex>(
    locator: &mut SourceLocator<I>,
    tree: &TestTree,
    active_file: Option<&Path>,
    selected: Option<NodeId>,
) -> SyncStatus {
    let (Some(file), Some(selected)) = (active_file, selected) else {
        return SyncStatus::Synced;
    };
    let Some(node) = tree.get(selected) else {
        return SyncStatus::Synced;
    };

    if let Ok(location) = locator.resolve(tree, selected) {
        if location.file == file {
            return SyncStatus::Synced;
        }
    }
    if node.kind == TestKind::Suite && locator.suite_covers_file(tree, selected, file) {
        return SyncStatus::Synced;
    }
    SyncStatus::Broken
}
