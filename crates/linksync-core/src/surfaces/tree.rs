use parking_lot::Mutex;
use std::sync::Arc;

use crate::dispatcher::{SurfaceError, SurfaceHost};
use crate::model::{EventPayload, NodeRef, Surface, TestTree};
use crate::sync::Target;

#[derive(Debug, Default)]
struct TreeModel {
    selection: Option<NodeRef>,
    echoes: Vec<EventPayload>,
}

/// Test-results tree view.
#[derive(Debug, Clone, Default)]
pub struct ResultsTreeHost {
    inner: Arc<Mutex<TreeModel>>,
}

impl ResultsTreeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<NodeRef> {
        self.inner.lock().selection.clone()
    }

    /// User clicks a node.
    pub fn select(&self, node: NodeRef) {
        self.inner.lock().selection = Some(node);
    }

    /// Show a freshly built tree, keeping the selection by qualified name.
    pub fn load(&self, tree: &TestTree) {
        let mut model = self.inner.lock();
        model.selection = model
            .selection
            .take()
            .and_then(|old| tree.find(&old.qualified_name))
            .and_then(|id| tree.node_ref(id));
    }
}

impl SurfaceHost for ResultsTreeHost {
    fn surface(&self) -> Surface {
        Surface::ResultsTree
    }

    fn reveal_and_select(&mut self, target: &Target) -> Result<(), SurfaceError> {
        match target {
            Target::Node { node } => {
                let mut model = self.inner.lock();
                model.selection = Some(node.clone());
                model
                    .echoes
                    .push(EventPayload::TreeSelection { node: node.clone() });
                Ok(())
            }
            other => Err(SurfaceError::UnknownTarget(other.to_string())),
        }
    }

    fn shows(&self, target: &Target) -> bool {
        match target {
            Target::Node { node } => self.inner.lock().selection.as_ref() == Some(node),
            _ => false,
        }
    }

    fn take_echoes(&mut self) -> Vec<EventPayload> {
        std::mem::take(&mut self.inner.lock().echoes)
    }
}
