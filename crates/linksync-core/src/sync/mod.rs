//! Link synchronizer.
//!
//! A reducer over selection events: each call takes one event and the
//! current state, updates the state and returns the commands the other
//! surfaces need plus the resulting status. It never talks to a surface
//! directly, so it runs the same under a GUI, a replayed scenario or a test.
//!
//! While linking is disabled the synchronizer still records selections and
//! tracks status, it only stops emitting commands.

mod command;
mod error;
mod state;

pub use command::{Command, Target, Transition};
pub use error::SyncError;
pub use state::{compute_status, LinkState, SyncStatus};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::index::{ProjectIndex, SymbolIndex};
use crate::locator::SourceLocator;
use crate::model::{
    DeclarationId, EventPayload, NodeId, NodeRef, Provenance, SelectionEvent, SourceLocation, Surface,
    TestKind, TestNode, TestTree, TextRange,
};

/// Synchronizer behaviour switches, usually taken from [`crate::config::LinkConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub link: LinkState,
    /// Whether runner selections move the editor.
    pub reveal_first_failure: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            link: LinkState::Enabled,
            reveal_first_failure: true,
        }
    }
}

impl From<&crate::config::LinkConfig> for SyncOptions {
    fn from(config: &crate::config::LinkConfig) -> Self {
        Self {
            link: LinkState::from_enabled(config.enabled),
            reveal_first_failure: config.reveal_first_failure,
        }
    }
}

/// What the synchronizer knows about open editors.
#[derive(Debug, Clone, Default)]
struct EditorState {
    active: Option<PathBuf>,
    carets: HashMap<PathBuf, TextRange>,
    /// File the last status evaluation was done for.
    last_evaluated: Option<PathBuf>,
}

/// Result of [`LinkSynchronizer::on_run_completed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCompletion {
    pub transition: Transition,
    /// Tree selection the runner makes; publish it with
    /// [`Provenance::Runner`].
    pub follow_up: Option<EventPayload>,
}

/// Selection-linking state machine.
#[derive(Debug)]
pub struct LinkSynchronizer<I = ProjectIndex> {
    locator: SourceLocator<I>,
    tree: TestTree,
    options: SyncOptions,
    selected: Option<NodeId>,
    editor: EditorState,
    status: SyncStatus,
    /// Set by a failed command or an unresolvable tree selection; cleared by
    /// the next input.
    forced_broken: bool,
}

impl<I: SymbolIndex> LinkSynchronizer<I> {
    pub fn new(locator: SourceLocator<I>, options: SyncOptions) -> Self {
        Self {
            locator,
            tree: TestTree::default(),
            options,
            selected: None,
            editor: EditorState::default(),
            status: SyncStatus::Synced,
            forced_broken: false,
        }
    }

    pub fn link_state(&self) -> LinkState {
        self.options.link
    }

    pub fn is_enabled(&self) -> bool {
        self.options.link.is_enabled()
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn tree(&self) -> &TestTree {
        &self.tree
    }

    pub fn selected(&self) -> Option<NodeRef> {
        self.selected.and_then(|id| self.tree.node_ref(id))
    }

    pub fn selected_node(&self) -> Option<&TestNode> {
        self.selected.and_then(|id| self.tree.get(id))
    }

    pub fn active_file(&self) -> Option<&Path> {
        self.editor.active.as_deref()
    }

    /// Last known caret in `file`.
    pub fn caret(&self, file: &Path) -> Option<TextRange> {
        self.editor.carets.get(file).copied()
    }

    pub fn locator(&self) -> &SourceLocator<I> {
        &self.locator
    }

    pub fn locator_mut(&mut self) -> &mut SourceLocator<I> {
        &mut self.locator
    }

    /// Process one published event.
    pub fn handle(&mut self, event: &SelectionEvent) -> Transition {
        self.forced_broken = false;
        let mut pass = Pass::default();

        match &event.payload {
            EventPayload::TreeSelection { node } => {
                self.on_tree_selection(node, event.provenance, &mut pass);
            }
            EventPayload::EditorCaret { file, range } => {
                self.editor.active = Some(file.clone());
                self.editor.carets.insert(file.clone(), *range);
                if self.is_enabled() {
                    self.propagate_caret(file, *range, &mut pass);
                }
                self.editor.last_evaluated = Some(file.clone());
            }
            EventPayload::EditorActivated { file, caret } => {
                self.editor.active = Some(file.clone());
                if let Some(caret) = caret {
                    self.editor.carets.insert(file.clone(), *caret);
                }
                let changed = self.editor.last_evaluated.as_deref() != Some(file.as_path());
                if self.is_enabled() && changed {
                    let caret = self.caret_for(file);
                    self.propagate_caret(file, caret, &mut pass);
                }
                self.editor.last_evaluated = Some(file.clone());
            }
            EventPayload::EditorClosed { file } => {
                self.editor.carets.remove(file);
                if self.editor.active.as_deref() == Some(file.as_path()) {
                    self.editor.active = None;
                    self.editor.last_evaluated = None;
                }
            }
            EventPayload::OutlineSelection { file, declaration } => {
                if self.is_enabled() {
                    self.on_outline_selection(file, declaration, &mut pass);
                }
            }
            EventPayload::BrowserSelection { path, member } => {
                self.on_browser_open(path, member.as_ref(), &mut pass);
            }
        }

        let transition = self.finish(pass);
        debug!(
            seq = event.seq,
            surface = %event.payload.surface(),
            commands = transition.commands.len(),
            status = %transition.status,
            "handled selection event"
        );
        transition
    }

    /// Switch linking on or off. Enabling re-evaluates the status but moves
    /// no selection.
    pub fn toggle_link(&mut self, enable: bool) -> Transition {
        self.options.link = LinkState::from_enabled(enable);
        self.forced_broken = false;
        debug!(enabled = enable, "link toggled");
        self.finish(Pass::default())
    }

    /// Replace the tree after a test run.
    ///
    /// The previous selection is carried over by qualified name. When the
    /// run reported a failure, the returned follow-up selects it.
    pub fn on_run_completed(&mut self, tree: TestTree, first_failure: Option<NodeId>) -> RunCompletion {
        let previous = self.selected_node().map(|n| n.qualified_name.clone());
        self.tree = tree;
        self.forced_broken = false;
        self.selected = previous.as_deref().and_then(|name| self.tree.find(name));

        let follow_up = first_failure
            .and_then(|id| self.tree.node_ref(id))
            .map(|node| EventPayload::TreeSelection { node });
        debug!(
            generation = self.tree.generation(),
            failures = self.tree.failure_count(),
            reselected = self.selected.is_some(),
            "run completed"
        );

        RunCompletion {
            transition: self.finish(Pass::default()),
            follow_up,
        }
    }

    /// A surface rejected a command. Status stays broken until the next input.
    pub fn on_command_failed(&mut self, surface: Surface, reason: impl Into<String>) -> Transition {
        let reason = reason.into();
        warn!(%surface, %reason, "command failed");
        self.forced_broken = true;
        let mut pass = Pass::default();
        pass.errors.push(SyncError::CommandFailed { surface, reason });
        self.finish(pass)
    }

    /// Source files changed on disk; their cached locations are dropped.
    pub fn on_index_updated(&mut self, changed: &[PathBuf]) -> Transition {
        for file in changed {
            self.locator.invalidate_file(file);
        }
        self.forced_broken = false;
        self.finish(Pass::default())
    }

    /// Explicitly open a node from the results tree, e.g. on double-click.
    ///
    /// Works whatever the link state. Failed methods open at the failing
    /// line when the runner reported one.
    pub fn open_node(&mut self, node: &NodeRef) -> Transition {
        self.forced_broken = false;
        let mut pass = Pass::default();

        if let Some(id) = self.map_node(node, &mut pass) {
            self.selected = Some(id);
            match self.locate(id, &mut pass) {
                Some(location) => {
                    let location = self.failure_location(id, location);
                    self.remember_open(&location);
                    pass.commands.push(Command::Open {
                        surface: Surface::Editor,
                        location,
                    });
                }
                None => self.forced_broken = true,
            }
        }
        self.finish(pass)
    }

    fn on_tree_selection(&mut self, node: &NodeRef, provenance: Provenance, pass: &mut Pass) {
        let Some(id) = self.map_node(node, pass) else {
            return;
        };
        self.selected = Some(id);

        let quiet_runner = provenance == Provenance::Runner && !self.options.reveal_first_failure;
        if !self.is_enabled() || quiet_runner {
            return;
        }

        match self.locate(id, pass) {
            Some(location) => {
                self.remember_open(&location);
                let outline = Command::RevealAndSelect {
                    surface: Surface::Outline,
                    target: Target::Declaration {
                        file: location.file.clone(),
                        declaration: location.declaration.clone(),
                    },
                };
                pass.commands.push(Command::Open {
                    surface: Surface::Editor,
                    location,
                });
                pass.commands.push(outline);
            }
            None => self.forced_broken = true,
        }
    }

    fn on_outline_selection(&mut self, file: &Path, declaration: &DeclarationId, pass: &mut Pass) {
        let Some(id) = self
            .locator
            .resolve_declaration(&self.tree, file, declaration, self.selected)
        else {
            return;
        };
        self.selected = Some(id);
        if let Some(node) = self.tree.node_ref(id) {
            pass.commands.push(Command::RevealAndSelect {
                surface: Surface::ResultsTree,
                target: Target::Node { node },
            });
        }
    }

    /// Opening from the browser is a user action: the editor state follows
    /// it whatever the link state, only the propagation is link-dependent.
    fn on_browser_open(&mut self, path: &Path, member: Option<&DeclarationId>, pass: &mut Pass) {
        let location = self.locator.open_location(path, member, self.caret_for(path));
        let caret = location.selection_range;

        self.editor.active = Some(path.to_path_buf());
        self.editor.carets.insert(path.to_path_buf(), caret);
        if self.is_enabled() {
            pass.commands.push(Command::Open {
                surface: Surface::Editor,
                location,
            });
            self.propagate_caret(path, caret, pass);
        }
        self.editor.last_evaluated = Some(path.to_path_buf());
    }

    /// Reverse-resolve a caret and select the result in tree and outline.
    /// Leaves the selection alone when the caret denotes nothing.
    fn propagate_caret(&mut self, file: &Path, caret: TextRange, pass: &mut Pass) {
        let Some(id) = self
            .locator
            .reverse_resolve(&self.tree, file, caret, self.selected)
        else {
            return;
        };
        self.selected = Some(id);

        if let Some(node) = self.tree.node_ref(id) {
            pass.commands.push(Command::RevealAndSelect {
                surface: Surface::ResultsTree,
                target: Target::Node { node },
            });
        }
        if let Some(declaration) = self.locator.outline_target(&self.tree, id) {
            pass.commands.push(Command::RevealAndSelect {
                surface: Surface::Outline,
                target: Target::Declaration {
                    file: file.to_path_buf(),
                    declaration,
                },
            });
        }
    }

    /// Map a node reference onto the current tree, re-mapping references
    /// from older trees by qualified name.
    fn map_node(&self, node: &NodeRef, pass: &mut Pass) -> Option<NodeId> {
        if self.tree.owns(node) {
            return Some(node.id);
        }
        let remapped = self.tree.find_near(&node.qualified_name, self.selected);
        if remapped.is_none() {
            pass.errors.push(SyncError::StaleTree {
                event_generation: node.generation,
                current_generation: self.tree.generation(),
            });
            debug!(node = %node, "dropped selection of a node that no longer exists");
        }
        remapped
    }

    fn locate(&mut self, id: NodeId, pass: &mut Pass) -> Option<SourceLocation> {
        match self.locator.resolve(&self.tree, id) {
            Ok(location) => Some(location),
            Err(e) => {
                debug!("{}", e);
                let qualified_name = self
                    .tree
                    .get(id)
                    .map(|n| n.qualified_name.clone())
                    .unwrap_or_default();
                pass.errors.push(SyncError::ResolutionMiss { qualified_name });
                None
            }
        }
    }

    fn failure_location(&self, id: NodeId, location: SourceLocation) -> SourceLocation {
        let failure_line = self
            .tree
            .get(id)
            .filter(|n| n.kind == TestKind::Method && n.outcome.is_failure())
            .and_then(|n| n.failure_line);
        match failure_line {
            Some(line) => self.locator.at_line(&location, line).unwrap_or(location),
            None => location,
        }
    }

    /// Track the editor state an `Open` command will produce.
    fn remember_open(&mut self, location: &SourceLocation) {
        self.editor.active = Some(location.file.clone());
        self.editor
            .carets
            .insert(location.file.clone(), location.selection_range);
        self.editor.last_evaluated = Some(location.file.clone());
    }

    /// Remembered caret for `file`, else where a fresh editor would put it.
    fn caret_for(&self, file: &Path) -> TextRange {
        self.caret(file)
            .unwrap_or_else(|| self.locator.default_caret(file))
    }

    fn finish(&mut self, pass: Pass) -> Transition {
        self.status = if self.forced_broken {
            SyncStatus::Broken
        } else {
            compute_status(
                &mut self.locator,
                &self.tree,
                self.editor.active.as_deref(),
                self.selected,
            )
        };
        Transition {
            commands: pass.commands,
            status: self.status,
            errors: pass.errors,
        }
    }
}

/// Accumulator for one pass.
#[derive(Debug, Default)]
struct Pass {
    commands: Vec<Command>,
    errors: Vec<SyncError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TP1: &str = "package junit.lwe;

import junit.framework.TestCase;

public class TP1 extends TestCase {
    String s;

    public void testGetStr1() {
        assertEquals(\"get\", \"get\");
    }

    public void testSetStr1() {
        assertEquals(\"set\", \"set\");
    }
}
";

    const A: &str = "package junit.lwe;

public class A {
    int value() { return 1; }
}
";

    const TP1_PATH: &str = "src/junit/lwe/TP1.java";
    const A_PATH: &str = "src/junit/lwe/A.java";

    fn tree() -> TestTree {
        let mut b = TestTree::builder();
        let root = b.root("JUnit-LWE", TestKind::Suite);
        let class = b.child(root, "junit.lwe.TP1", TestKind::Class);
        b.method(class, "testGetStr1");
        b.method(class, "testSetStr1");
        b.build()
    }

    fn synchronizer() -> LinkSynchronizer {
        let index = ProjectIndex::from_sources("/p", [(TP1_PATH, TP1), (A_PATH, A)]).unwrap();
        let mut sync = LinkSynchronizer::new(SourceLocator::new(index), SyncOptions::default());
        sync.on_run_completed(tree(), None);
        sync
    }

    fn event(payload: EventPayload) -> SelectionEvent {
        SelectionEvent {
            seq: 1,
            provenance: Provenance::User,
            payload,
        }
    }

    fn select(sync: &LinkSynchronizer, name: &str) -> SelectionEvent {
        let id = sync.tree().find(name).unwrap();
        event(EventPayload::TreeSelection {
            node: sync.tree().node_ref(id).unwrap(),
        })
    }

    #[test]
    fn test_tree_selection_opens_editor_and_outline() {
        let mut sync = synchronizer();
        let t = sync.handle(&select(&sync, "junit.lwe.TP1.testGetStr1"));
        assert_eq!(t.status, SyncStatus::Synced);
        assert_eq!(t.commands.len(), 2);
        assert!(matches!(&t.commands[0], Command::Open { surface: Surface::Editor, location }
            if location.declaration == DeclarationId::for_member("junit.lwe.TP1", "testGetStr1")));
        assert_eq!(t.commands[1].surface(), Surface::Outline);
        assert_eq!(sync.active_file(), Some(Path::new(TP1_PATH)));
    }

    #[test]
    fn test_unresolvable_selection_is_broken_without_commands() {
        let mut sync = synchronizer();
        let t = sync.handle(&select(&sync, "JUnit-LWE"));
        assert!(t.commands.is_empty());
        assert_eq!(t.status, SyncStatus::Broken);
        assert!(matches!(t.errors[0], SyncError::ResolutionMiss { .. }));
    }

    #[test]
    fn test_disabled_tracks_selection_without_commands() {
        let mut sync = synchronizer();
        sync.toggle_link(false);
        let t = sync.handle(&select(&sync, "junit.lwe.TP1.testGetStr1"));
        assert!(t.commands.is_empty());
        assert_eq!(sync.selected_node().unwrap().name, "testGetStr1");
    }

    #[test]
    fn test_stale_reference_remapped_by_name() {
        let mut sync = synchronizer();
        let stale = select(&sync, "junit.lwe.TP1.testSetStr1");
        sync.on_run_completed(tree(), None);
        let t = sync.handle(&stale);
        assert!(t.errors.is_empty());
        assert_eq!(sync.selected_node().unwrap().name, "testSetStr1");
        assert_eq!(sync.selected().unwrap().generation, sync.tree().generation());
    }

    #[test]
    fn test_stale_reference_to_vanished_node_dropped() {
        let mut sync = synchronizer();
        let stale = event(EventPayload::TreeSelection {
            node: NodeRef {
                generation: 0,
                id: NodeId(7),
                qualified_name: "junit.lwe.Gone".to_string(),
            },
        });
        let t = sync.handle(&stale);
        assert!(matches!(t.errors[0], SyncError::StaleTree { .. }));
        assert!(sync.selected().is_none());
    }

    #[test]
    fn test_command_failure_forces_broken_until_next_event() {
        let mut sync = synchronizer();
        sync.handle(&select(&sync, "junit.lwe.TP1.testGetStr1"));
        let t = sync.on_command_failed(Surface::Editor, "file deleted");
        assert_eq!(t.status, SyncStatus::Broken);
        let t = sync.handle(&event(EventPayload::EditorActivated {
            file: PathBuf::from(TP1_PATH),
            caret: None,
        }));
        assert_eq!(t.status, SyncStatus::Synced);
    }

    #[test]
    fn test_editor_closed_clears_active_editor() {
        let mut sync = synchronizer();
        sync.handle(&select(&sync, "junit.lwe.TP1.testGetStr1"));
        sync.handle(&event(EventPayload::BrowserSelection {
            path: PathBuf::from(A_PATH),
            member: None,
        }));
        assert_eq!(sync.status(), SyncStatus::Broken);
        let t = sync.handle(&event(EventPayload::EditorClosed {
            file: PathBuf::from(A_PATH),
        }));
        assert_eq!(t.status, SyncStatus::Synced);
        assert!(sync.active_file().is_none());
    }

    #[test]
    fn test_disabled_browser_open_moves_editor_without_commands() {
        let mut sync = synchronizer();
        sync.toggle_link(false);
        sync.handle(&select(&sync, "junit.lwe.TP1.testGetStr1"));
        let t = sync.handle(&event(EventPayload::BrowserSelection {
            path: PathBuf::from(A_PATH),
            member: None,
        }));
        assert!(t.commands.is_empty());
        assert_eq!(t.status, SyncStatus::Broken);
        assert_eq!(sync.active_file(), Some(Path::new(A_PATH)));
        assert_eq!(sync.selected_node().unwrap().name, "testGetStr1");
    }

    #[test]
    fn test_open_node_ignores_link_state_and_uses_failure_line() {
        let mut b = TestTree::builder();
        let root = b.root("JUnit-LWE", TestKind::Suite);
        let class = b.child(root, "junit.lwe.TP1", TestKind::Class);
        let set = b.method(class, "testSetStr1");
        b.outcome(set, crate::model::TestOutcome::Failed).failure_line(set, 13);
        let failed_tree = b.build();

        let mut sync = synchronizer();
        sync.toggle_link(false);
        sync.on_run_completed(failed_tree, None);
        let node = sync.tree().node_ref(set).unwrap();
        let t = sync.open_node(&node);
        match &t.commands[..] {
            [Command::Open { location, .. }] => {
                assert_eq!(location.line, 13);
                assert!(TP1[location.selection_range.start..location.selection_range.end]
                    .contains("\"set\""));
            }
            other => panic!("unexpected commands: {:?}", other),
        }
    }
}
