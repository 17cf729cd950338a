//! Async front-end for a link session.
//!
//! Surfaces, the test runner and the indexer may live on different tasks.
//! They all send inputs through one unbounded channel; a single task owns the
//! session and processes inputs strictly in arrival order. The rendered
//! indicator is published on a `watch` channel.

use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::index::ProjectIndex;
use crate::indicator::IndicatorView;
use crate::model::{DeclarationId, NodeRef, TestTree, TextRange};
use crate::session::{LinkSession, SessionOutcome};

/// Inputs accepted by the service.
#[derive(Debug, Clone)]
pub enum SyncInput {
    /// A node was selected in the results tree.
    SelectNode(NodeRef),
    /// The caret moved in an editor.
    SelectText { file: PathBuf, range: TextRange },
    /// An editor became active.
    ActivateEditor(PathBuf),
    /// An editor was closed.
    CloseEditor(PathBuf),
    /// A declaration was picked in the outline.
    SelectOutline { file: PathBuf, declaration: DeclarationId },
    /// A file or member was picked in the project browser.
    Browse {
        path: PathBuf,
        member: Option<DeclarationId>,
    },
    /// The link toggle was flipped.
    ToggleLink(bool),
    /// A node was double-clicked.
    OpenNode(NodeRef),
    /// A test run finished.
    RunCompleted(TestTree),
    /// A source file has new content.
    SourceChanged { path: PathBuf, content: String },
}

/// Service errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("sync service has stopped")]
    Stopped,
}

/// Cloneable handle for sending inputs and watching the indicator.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncInput>,
    view: watch::Receiver<IndicatorView>,
}

impl SyncHandle {
    pub fn send(&self, input: SyncInput) -> Result<(), ServiceError> {
        self.tx.send(input).map_err(|_| ServiceError::Stopped)
    }

    /// Receiver of the rendered indicator, updated after every input.
    pub fn view(&self) -> watch::Receiver<IndicatorView> {
        self.view.clone()
    }
}

/// Runs a session on its own task.
pub struct SyncService;

impl SyncService {
    /// Move `session` onto a task. The task ends, handing the session back,
    /// once every handle has been dropped.
    pub fn spawn(mut session: LinkSession<ProjectIndex>) -> (SyncHandle, JoinHandle<LinkSession<ProjectIndex>>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(session.view().clone());

        let task = tokio::spawn(async move {
            while let Some(input) = rx.recv().await {
                let outcome = Self::process(&mut session, input);
                debug!(
                    events = outcome.events.len(),
                    commands = outcome.commands.len(),
                    "processed input"
                );
                view_tx.send_if_modified(|view| {
                    if view != session.view() {
                        *view = session.view().clone();
                        true
                    } else {
                        false
                    }
                });
            }
            debug!("sync service stopped");
            session
        });

        (SyncHandle { tx, view: view_rx }, task)
    }

    fn process(session: &mut LinkSession<ProjectIndex>, input: SyncInput) -> SessionOutcome {
        match input {
            SyncInput::SelectNode(node) => session.select_node(node),
            SyncInput::SelectText { file, range } => session.select_text(file, range),
            SyncInput::ActivateEditor(file) => session.activate_editor(file),
            SyncInput::CloseEditor(file) => session.close_editor(file),
            SyncInput::SelectOutline { file, declaration } => session.select_outline(file, declaration),
            SyncInput::Browse { path, member } => session.browse(path, member),
            SyncInput::ToggleLink(enable) => session.toggle_link(enable),
            SyncInput::OpenNode(node) => session.open_node(&node),
            SyncInput::RunCompleted(tree) => session.run_completed(tree),
            SyncInput::SourceChanged { path, content } => {
                match session.update_source(&path, &content) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Failed to index {}: {}", path.display(), e);
                        SessionOutcome::default()
                    }
                }
            }
        }
    }
}
