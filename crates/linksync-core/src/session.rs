//! Link session: one sequencer over bus, synchronizer, dispatcher and
//! indicator.
//!
//! User actions update the matching surface host and are published on the
//! bus; every queued event then runs through the synchronizer, its commands
//! go to the dispatcher, and the indicator is re-rendered. Echoes raised by
//! the hosts are published with dispatcher provenance and dropped by the bus.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::bus::{SelectionBus, SubscriptionId};
use crate::config::{Config, IndexConfig};
use crate::dispatcher::{CommandDispatcher, DispatchReport};
use crate::index::{IndexError, ProjectIndex, SymbolIndex};
use crate::indicator::{Indicator, IndicatorView};
use crate::locator::SourceLocator;
use crate::model::{
    DeclarationId, EventPayload, NodeRef, Provenance, SelectionEvent, TestTree, TextRange,
};
use crate::surfaces::{BrowserHost, EditorHost, OutlineHost, ResultsTreeHost};
use crate::sync::{Command, LinkSynchronizer, SyncError, SyncOptions, SyncStatus, Transition};

/// Everything one user action caused.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionOutcome {
    /// Sequence numbers of the events processed.
    pub events: Vec<u64>,
    pub commands: Vec<Command>,
    pub applied: usize,
    pub skipped: usize,
    /// Rendered errors, synchronizer and surface alike.
    pub errors: Vec<String>,
    pub status: Option<SyncStatus>,
}

impl SessionOutcome {
    fn absorb(&mut self, transition: &Transition, report: &DispatchReport) {
        self.commands.extend(transition.commands.iter().cloned());
        self.applied += report.applied;
        self.skipped += report.skipped;
        self.errors
            .extend(transition.errors.iter().map(SyncError::to_string));
        self.errors
            .extend(report.failed.iter().map(|f| f.error.to_string()));
        self.status = Some(transition.status);
    }
}

/// A linked set of surfaces over one project.
pub struct LinkSession<I = ProjectIndex> {
    bus: SelectionBus,
    sync: LinkSynchronizer<I>,
    dispatcher: CommandDispatcher,
    indicator: Indicator,
    view: IndicatorView,
    editor: EditorHost,
    tree_view: ResultsTreeHost,
    outline: OutlineHost,
    browser: BrowserHost,
    /// Editor file and caret the outline last followed.
    followed: Option<(PathBuf, TextRange)>,
}

impl<I: SymbolIndex> LinkSession<I> {
    pub fn new(index: I, config: &Config) -> Self {
        let sync = LinkSynchronizer::new(SourceLocator::new(index), SyncOptions::from(&config.link));
        let indicator = Indicator::new(config.indicator.clone());
        let view = indicator.render(sync.status(), sync.is_enabled());

        let editor = EditorHost::new();
        let tree_view = ResultsTreeHost::new();
        let outline = OutlineHost::new();
        let browser = BrowserHost::new();

        let mut dispatcher = CommandDispatcher::new();
        dispatcher.register(Box::new(editor.clone()));
        dispatcher.register(Box::new(tree_view.clone()));
        dispatcher.register(Box::new(outline.clone()));
        dispatcher.register(Box::new(browser.clone()));

        Self {
            bus: SelectionBus::new(),
            sync,
            dispatcher,
            indicator,
            view,
            editor,
            tree_view,
            outline,
            browser,
            followed: None,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn view(&self) -> &IndicatorView {
        &self.view
    }

    pub fn is_enabled(&self) -> bool {
        self.sync.is_enabled()
    }

    pub fn synchronizer(&self) -> &LinkSynchronizer<I> {
        &self.sync
    }

    pub fn tree(&self) -> &TestTree {
        self.sync.tree()
    }

    pub fn bus(&self) -> &SelectionBus {
        &self.bus
    }

    pub fn editor(&self) -> &EditorHost {
        &self.editor
    }

    pub fn tree_view(&self) -> &ResultsTreeHost {
        &self.tree_view
    }

    pub fn outline(&self) -> &OutlineHost {
        &self.outline
    }

    pub fn browser(&self) -> &BrowserHost {
        &self.browser
    }

    /// Observe every delivered event.
    pub fn subscribe(&mut self, handler: impl FnMut(&SelectionEvent) + Send + 'static) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    /// Reference to the first node with this qualified name.
    pub fn node(&self, qualified_name: &str) -> Option<NodeRef> {
        let tree = self.sync.tree();
        tree.find(qualified_name).and_then(|id| tree.node_ref(id))
    }

    /// Publish an event and run the synchronization passes it causes.
    pub fn publish(&mut self, payload: EventPayload, provenance: Provenance) -> SessionOutcome {
        let mut outcome = SessionOutcome::default();
        self.bus.publish(payload, provenance);
        self.drain(&mut outcome);
        outcome
    }

    /// User selects a node in the results tree.
    pub fn select_node(&mut self, node: NodeRef) -> SessionOutcome {
        self.tree_view.select(node.clone());
        let outcome = self.publish(EventPayload::TreeSelection { node }, Provenance::User);
        if let Some(selected) = self.sync.selected() {
            self.tree_view.select(selected);
        }
        outcome
    }

    /// User moves the caret or selects text in `file`.
    pub fn select_text(&mut self, file: impl Into<PathBuf>, range: TextRange) -> SessionOutcome {
        let file = file.into();
        self.editor.set_caret(&file, range);
        self.publish(EventPayload::EditorCaret { file, range }, Provenance::User)
    }

    /// User selects a whole 1-based line of `file`.
    pub fn select_line(&mut self, file: impl Into<PathBuf>, line: u32) -> Option<SessionOutcome> {
        let file = file.into();
        let range = self.sync.locator().index().file(&file)?.line_range(line)?;
        Some(self.select_text(file, range))
    }

    /// User switches to an editor, opening it if needed.
    pub fn activate_editor(&mut self, file: impl Into<PathBuf>) -> SessionOutcome {
        let file = file.into();
        let caret = self
            .editor
            .activate(&file, self.sync.locator().default_caret(&file));
        self.publish(
            EventPayload::EditorActivated {
                file,
                caret: Some(caret),
            },
            Provenance::User,
        )
    }

    /// User closes an editor; the next one becomes active.
    pub fn close_editor(&mut self, file: impl Into<PathBuf>) -> SessionOutcome {
        let file = file.into();
        let next = self.editor.close(&file);
        let mut outcome = self.publish(EventPayload::EditorClosed { file }, Provenance::User);
        if let Some(next) = next {
            let caret = self.editor.caret(&next);
            self.bus.publish(
                EventPayload::EditorActivated { file: next, caret },
                Provenance::User,
            );
            self.drain(&mut outcome);
        }
        outcome
    }

    /// User picks a declaration in the outline.
    pub fn select_outline(&mut self, file: impl Into<PathBuf>, declaration: DeclarationId) -> SessionOutcome {
        let file = file.into();
        self.outline.select(file.clone(), declaration.clone());
        self.publish(EventPayload::OutlineSelection { file, declaration }, Provenance::User)
    }

    /// User picks a file, or a member below it, in the project browser.
    ///
    /// The file opens in the editor whatever the link state.
    pub fn browse(&mut self, path: impl Into<PathBuf>, member: Option<DeclarationId>) -> SessionOutcome {
        let path = path.into();
        self.browser.select(path.clone(), member.clone());
        let locator = self.sync.locator();
        let caret = self
            .editor
            .caret(&path)
            .unwrap_or_else(|| locator.default_caret(&path));
        let location = locator.open_location(&path, member.as_ref(), caret);
        self.editor.set_caret(&path, location.selection_range);
        self.publish(EventPayload::BrowserSelection { path, member }, Provenance::User)
    }

    /// User flips the "Link with Editor" toggle.
    pub fn toggle_link(&mut self, enable: bool) -> SessionOutcome {
        let transition = self.sync.toggle_link(enable);
        let mut outcome = SessionOutcome::default();
        self.apply(&transition, &mut outcome);
        outcome
    }

    /// User double-clicks a node in the results tree.
    pub fn open_node(&mut self, node: &NodeRef) -> SessionOutcome {
        let transition = self.sync.open_node(node);
        if let Some(selected) = self.sync.selected() {
            self.tree_view.select(selected);
        }
        let mut outcome = SessionOutcome::default();
        self.apply(&transition, &mut outcome);
        outcome
    }

    /// A test run finished with `tree`. The runner selects the first
    /// failure, if any.
    pub fn run_completed(&mut self, tree: TestTree) -> SessionOutcome {
        let first_failure = tree.first_failure();
        self.tree_view.load(&tree);
        let completion = self.sync.on_run_completed(tree, first_failure);

        let mut outcome = SessionOutcome::default();
        self.apply(&completion.transition, &mut outcome);
        if let Some(follow_up) = completion.follow_up {
            if let EventPayload::TreeSelection { node } = &follow_up {
                self.tree_view.select(node.clone());
            }
            self.bus.publish(follow_up, Provenance::Runner);
            self.drain(&mut outcome);
        }
        outcome
    }

    /// Source files changed; cached locations inside them are dropped.
    pub fn index_updated(&mut self, changed: &[PathBuf]) -> SessionOutcome {
        let transition = self.sync.on_index_updated(changed);
        let mut outcome = SessionOutcome::default();
        self.apply(&transition, &mut outcome);
        outcome
    }

    /// The outline tracks the editor on its own, independent of linking:
    /// whenever the active file or its caret moved, it highlights the
    /// declaration under the caret.
    fn follow_editor(&mut self) {
        let active = self.editor.active();
        let position = active
            .as_ref()
            .map(|file| (file.clone(), self.editor.caret(file).unwrap_or_default()));
        if position == self.followed {
            return;
        }

        let declaration = position
            .as_ref()
            .and_then(|(file, caret)| self.sync.locator().declaration_at(file, *caret));
        trace!(file = ?active, declaration = ?declaration, "outline follows editor");
        self.outline.follow(active, declaration);
        self.followed = position;
    }

    fn drain(&mut self, outcome: &mut SessionOutcome) {
        while let Some(event) = self.bus.next_pending() {
            outcome.events.push(event.seq);
            let transition = self.sync.handle(&event);
            self.apply(&transition, outcome);
        }
    }

    fn apply(&mut self, transition: &Transition, outcome: &mut SessionOutcome) {
        let report = self.dispatcher.dispatch(&transition.commands);
        outcome.absorb(transition, &report);

        for failure in &report.failed {
            let failed = self
                .sync
                .on_command_failed(failure.command.surface(), failure.error.to_string());
            outcome.status = Some(failed.status);
            outcome
                .errors
                .extend(failed.errors.iter().map(SyncError::to_string));
        }

        for echo in self.dispatcher.take_echoes() {
            self.bus.publish(echo, Provenance::Dispatcher);
        }
        self.follow_editor();
        self.view = self.indicator.render(self.sync.status(), self.sync.is_enabled());

        debug!(
            commands = transition.commands.len(),
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed.len(),
            status = %self.sync.status(),
            "applied transition"
        );
    }
}

impl LinkSession<ProjectIndex> {
    /// Re-parse one file and refresh the status.
    pub fn update_source(&mut self, path: &Path, content: &str) -> Result<SessionOutcome, IndexError> {
        let index = self.sync.locator_mut().index_mut();
        let changed = index.update_source(path, content)?;
        let key = index.relativize(path);
        let changed = if changed { vec![key] } else { Vec::new() };
        Ok(self.index_updated(&changed))
    }

    /// Re-walk the project and refresh the status.
    pub fn refresh_index(&mut self, config: &IndexConfig) -> Result<SessionOutcome, IndexError> {
        let changed = self.sync.locator_mut().index_mut().refresh(config)?;
        Ok(self.index_updated(&changed))
    }
}

impl<I> std::fmt::Debug for LinkSession<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSession")
            .field("bus", &self.bus)
            .field("dispatcher", &self.dispatcher)
            .field("view", &self.view)
            .finish()
    }
}
