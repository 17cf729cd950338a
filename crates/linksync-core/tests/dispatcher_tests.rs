use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use linksync_core::dispatcher::DispatchFailure;
use linksync_core::{
    Command, CommandDispatcher, DeclarationId, NodeId, NodeRef, SourceLocation, Surface, SurfaceError,
    SurfaceHost, Target, TextRange,
};

/// Host that records applied targets and rejects one name.
struct RecordingHost {
    surface: Surface,
    shown: Option<Target>,
    applied: Arc<Mutex<Vec<Target>>>,
    reject: Option<String>,
}

impl RecordingHost {
    fn new(surface: Surface) -> (Self, Arc<Mutex<Vec<Target>>>) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let host = Self {
            surface,
            shown: None,
            applied: Arc::clone(&applied),
            reject: None,
        };
        (host, applied)
    }
}

impl SurfaceHost for RecordingHost {
    fn surface(&self) -> Surface {
        self.surface
    }

    fn reveal_and_select(&mut self, target: &Target) -> Result<(), SurfaceError> {
        if let (Some(reject), Target::Node { node }) = (&self.reject, target) {
            if &node.qualified_name == reject {
                return Err(SurfaceError::UnknownTarget(reject.clone()));
            }
        }
        self.shown = Some(target.clone());
        self.applied.lock().unwrap().push(target.clone());
        Ok(())
    }

    fn shows(&self, target: &Target) -> bool {
        self.shown.as_ref() == Some(target)
    }
}

fn node(name: &str) -> NodeRef {
    NodeRef {
        generation: 1,
        id: NodeId(0),
        qualified_name: name.to_string(),
    }
}

fn select(name: &str) -> Command {
    Command::RevealAndSelect {
        surface: Surface::ResultsTree,
        target: Target::Node { node: node(name) },
    }
}

#[test]
fn test_dispatch_is_idempotent() {
    let (host, applied) = RecordingHost::new(Surface::ResultsTree);
    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register(Box::new(host));

    let commands = vec![select("a.B.testX")];
    let first = dispatcher.dispatch(&commands);
    let second = dispatcher.dispatch(&commands);

    assert_eq!(first.applied, 1);
    assert_eq!(second.applied, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(applied.lock().unwrap().len(), 1);
}

#[test]
fn test_failure_does_not_stop_later_commands() {
    let (mut host, applied) = RecordingHost::new(Surface::ResultsTree);
    host.reject = Some("a.B.gone".to_string());
    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register(Box::new(host));

    let report = dispatcher.dispatch(&[select("a.B.gone"), select("a.B.testX")]);
    assert_eq!(report.applied, 1);
    assert!(!report.is_clean());
    assert_eq!(
        report.failed,
        vec![DispatchFailure {
            command: select("a.B.gone"),
            error: SurfaceError::UnknownTarget("a.B.gone".to_string()),
        }]
    );
    assert_eq!(applied.lock().unwrap().len(), 1);
}

#[test]
fn test_commands_only_reach_named_surface() {
    let (tree, tree_applied) = RecordingHost::new(Surface::ResultsTree);
    let (outline, outline_applied) = RecordingHost::new(Surface::Outline);
    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register(Box::new(tree));
    dispatcher.register(Box::new(outline));

    let outline_target = Target::Declaration {
        file: PathBuf::from("B.java"),
        declaration: DeclarationId::for_member("a.B", "testX"),
    };
    dispatcher.dispatch(&[Command::RevealAndSelect {
        surface: Surface::Outline,
        target: outline_target.clone(),
    }]);

    assert!(tree_applied.lock().unwrap().is_empty());
    assert_eq!(*outline_applied.lock().unwrap(), vec![outline_target]);
}

#[test]
fn test_unregistered_surface_and_default_open() {
    let (tree, _) = RecordingHost::new(Surface::ResultsTree);
    let mut dispatcher = CommandDispatcher::new();
    dispatcher.register(Box::new(tree));

    let location = SourceLocation {
        file: PathBuf::from("B.java"),
        declaration_range: TextRange::new(0, 10),
        selection_range: TextRange::new(6, 7),
        line: 1,
        declaration: DeclarationId::for_type("a.B"),
    };
    let report = dispatcher.dispatch(&[
        Command::Open {
            surface: Surface::Editor,
            location: location.clone(),
        },
        Command::Open {
            surface: Surface::ResultsTree,
            location,
        },
    ]);

    assert_eq!(report.skipped, 1);
    assert!(matches!(report.failed[0].error, SurfaceError::Unsupported(_)));
    assert!(dispatcher.take_echoes().is_empty());
}
