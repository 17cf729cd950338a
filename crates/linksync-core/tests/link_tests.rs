use std::path::{Path, PathBuf};

use linksync_core::config::{Config, DEFAULT_BROKEN_ICON, DEFAULT_SYNCED_ICON};
use linksync_core::{
    DeclarationId, EventPayload, LinkSession, NodeRef, ProjectIndex, Provenance, SyncStatus, TestKind,
    TestOutcome, TestTree, TextRange,
};

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

const TP2: &str = "package junit.lwe;

import junit.framework.TestCase;

public class TP2 extends TestCase {
    public void testGetStr2() {
        assertEquals(\"get\", \"get\");
    }

    public void testSetStr2() {
        assertEquals(\"set\", \"other\");
    }
}
";

const ALL_TESTS: &str = "package junit.lwe;

import junit.framework.Test;
import junit.framework.TestSuite;

public class AllTests {
    public static Test suite() {
        TestSuite suite = new TestSuite(\"AllTests\");
        suite.addTestSuite(TP1.class);
        suite.addTestSuite(TP2.class);
        return suite;
    }
}
";

const A: &str = "package junit.lwe;

public class A {
    public String value() {
        return \"a\";
    }
}
";

const TP1_PATH: &str = "src/junit/lwe/TP1.java";
const TP2_PATH: &str = "src/junit/lwe/TP2.java";
const A_PATH: &str = "src/junit/lwe/A.java";

/// Passing run, or a run where `testSetStr1` and `testSetStr2` fail.
fn tree(failing: bool) -> TestTree {
    let failed = if failing { TestOutcome::Failed } else { TestOutcome::Passed };
    let mut b = TestTree::builder();
    let root = b.root("JUnit-LWE", TestKind::Suite);
    let all = b.child(root, "junit.lwe.AllTests", TestKind::Suite);

    let tp1 = b.child(all, "junit.lwe.TP1", TestKind::Class);
    let get1 = b.method(tp1, "testGetStr1");
    b.outcome(get1, TestOutcome::Passed);
    let set1 = b.method(tp1, "testSetStr1");
    b.outcome(set1, failed).failure_line(set1, 13);

    let tp2 = b.child(all, "junit.lwe.TP2", TestKind::Class);
    let get2 = b.method(tp2, "testGetStr2");
    b.outcome(get2, TestOutcome::Passed);
    let set2 = b.method(tp2, "testSetStr2");
    b.outcome(set2, failed).failure_line(set2, 11);
    b.build()
}

fn session_with(config: &Config) -> LinkSession {
    let index = ProjectIndex::from_sources(
        "/project",
        [
            (TP1_PATH, TP1),
            (TP2_PATH, TP2),
            ("src/junit/lwe/AllTests.java", ALL_TESTS),
            (A_PATH, A),
        ],
    )
    .unwrap();
    let mut session = LinkSession::new(index, config);
    session.run_completed(tree(false));
    session
}

fn session() -> LinkSession {
    session_with(&Config::default())
}

fn node(session: &LinkSession, name: &str) -> NodeRef {
    session.node(name).unwrap()
}

fn selected(session: &LinkSession) -> Option<String> {
    session
        .synchronizer()
        .selected_node()
        .map(|n| n.qualified_name.clone())
}

fn range_of(content: &str, text: &str) -> TextRange {
    let start = content.find(text).unwrap();
    TextRange::new(start, start + text.len())
}

fn editor_text(session: &LinkSession, content: &'static str) -> &'static str {
    let file = session.editor().active().unwrap();
    let caret = session.editor().caret(&file).unwrap();
    &content[caret.start..caret.end]
}

#[test]
fn test_reselecting_tree_node_is_idempotent() {
    let mut session = session();
    let get = node(&session, "junit.lwe.TP1.testGetStr1");

    let first = session.select_node(get.clone());
    let after_first = (
        session.editor().active(),
        session.editor().caret(Path::new(TP1_PATH)),
        session.outline().selection(),
        session.status(),
    );
    assert_eq!(first.applied, 2);

    let second = session.select_node(get);
    let after_second = (
        session.editor().active(),
        session.editor().caret(Path::new(TP1_PATH)),
        session.outline().selection(),
        session.status(),
    );
    assert_eq!(after_first, after_second);
    assert_eq!(second.commands, first.commands);
    assert_eq!(second.applied, 0);
    assert_eq!(second.skipped, 2);
}

#[test]
fn test_disabled_link_dispatches_nothing_but_tracks_status() {
    let mut session = session();
    session.toggle_link(false);
    let get = node(&session, "junit.lwe.TP1.testGetStr1");

    let outcomes = vec![
        session.select_node(get),
        session.activate_editor(A_PATH),
        session.select_text(A_PATH, range_of(A, "value")),
        session.select_outline(TP1_PATH, DeclarationId::for_member("junit.lwe.TP1", "testSetStr1")),
        session.browse(TP2_PATH, None),
        session.close_editor(A_PATH),
    ];
    for outcome in &outcomes {
        assert!(outcome.commands.is_empty());
        assert_eq!(outcome.applied, 0);
        assert!(outcome.status.is_some());
    }

    // Status kept being recomputed against whichever editor was active.
    assert_eq!(outcomes[1].status, Some(SyncStatus::Broken));
    assert_eq!(outcomes[4].status, Some(SyncStatus::Broken));
    assert_eq!(outcomes[5].status, Some(SyncStatus::Broken));
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testGetStr1"));
    // Opening from the browser is a user action, not a propagation.
    assert_eq!(session.editor().active(), Some(PathBuf::from(TP2_PATH)));
}

#[test]
fn test_browse_while_disabled_opens_editor_and_run_stays_broken() {
    let mut session = session();
    session.toggle_link(false);
    session.open_node(&node(&session, "junit.lwe.TP1.testGetStr1"));

    let outcome = session.browse(A_PATH, None);
    assert!(outcome.commands.is_empty());
    assert_eq!(session.editor().active(), Some(PathBuf::from(A_PATH)));
    assert_eq!(outcome.status, Some(SyncStatus::Broken));

    let outcome = session.run_completed(tree(true));
    assert!(outcome.commands.is_empty());
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testSetStr1"));
    assert_eq!(session.editor().active(), Some(PathBuf::from(A_PATH)));
    assert_eq!(session.status(), SyncStatus::Broken);
}

#[test]
fn test_outline_follows_editor_while_disabled() {
    let mut session = session();
    session.toggle_link(false);
    session.open_node(&node(&session, "junit.lwe.TP1.testGetStr1"));
    assert_eq!(
        session.outline().selection(),
        Some(DeclarationId::for_member("junit.lwe.TP1", "testGetStr1"))
    );

    // Method name.
    let outcome = session.select_text(TP1_PATH, range_of(TP1, "testSetStr1"));
    assert!(outcome.commands.is_empty());
    assert_eq!(
        session.outline().selection(),
        Some(DeclarationId::for_member("junit.lwe.TP1", "testSetStr1"))
    );

    // Method body.
    let body = range_of(TP1, "\"get\"");
    session.select_text(TP1_PATH, TextRange::caret(body.start + 1));
    assert_eq!(
        session.outline().selection(),
        Some(DeclarationId::for_member("junit.lwe.TP1", "testGetStr1"))
    );

    // Type name.
    session.select_text(TP1_PATH, range_of(TP1, "TP1"));
    assert_eq!(session.outline().selection(), Some(DeclarationId::for_type("junit.lwe.TP1")));

    // The tree did not move.
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testGetStr1"));
    assert_eq!(
        session.tree_view().selection().map(|n| n.qualified_name),
        Some("junit.lwe.TP1.testGetStr1".to_string())
    );
}

#[test]
fn test_open_node_shows_remapped_reference_in_tree() {
    let mut session = session();
    let stale = node(&session, "junit.lwe.TP2.testSetStr2");
    session.run_completed(tree(true));

    session.open_node(&stale);
    let shown = session.tree_view().selection().unwrap();
    assert_eq!(Some(shown.clone()), session.synchronizer().selected());
    assert_eq!(shown.generation, session.tree().generation());
    assert_ne!(shown.generation, stale.generation);
    assert_eq!(shown.qualified_name, "junit.lwe.TP2.testSetStr2");
}

#[test]
fn test_import_line_and_type_line_asymmetry() {
    let mut session = session();
    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));

    let import = session.select_line(TP1_PATH, 3).unwrap();
    assert!(import.commands.is_empty());
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testGetStr1"));
    assert_eq!(session.outline().selection(), None);

    let type_line = session.select_line(TP1_PATH, 5).unwrap();
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1"));
    assert_eq!(session.outline().selection(), Some(DeclarationId::for_type("junit.lwe.TP1")));
    assert_eq!(type_line.status, Some(SyncStatus::Synced));
}

#[test]
fn test_field_line_leaves_selection_and_status() {
    let mut session = session();
    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));

    let field = session.select_line(TP1_PATH, 6).unwrap();
    assert!(field.commands.is_empty());
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testGetStr1"));
    assert_eq!(session.status(), SyncStatus::Synced);
}

#[test]
fn test_tree_editor_round_trip() {
    for name in ["junit.lwe.TP1", "junit.lwe.TP1.testGetStr1", "junit.lwe.TP2.testSetStr2"] {
        let mut session = session();
        let target = node(&session, name);
        session.select_node(target.clone());

        let file = session.editor().active().unwrap();
        let caret = session.editor().caret(&file).unwrap();
        session.select_text(file, caret);

        let back = session.synchronizer().selected().unwrap();
        assert_eq!(back, target, "round trip of {}", name);
    }
}

#[test]
fn test_tp1_caret_follows_into_tree_and_outline() {
    let mut session = session();
    let outcome = session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));
    assert_eq!(outcome.status, Some(SyncStatus::Synced));
    assert_eq!(session.editor().active(), Some(PathBuf::from(TP1_PATH)));
    assert_eq!(editor_text(&session, TP1), "testGetStr1");

    let outcome = session.select_text(TP1_PATH, range_of(TP1, "testSetStr1"));
    assert_eq!(outcome.status, Some(SyncStatus::Synced));
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testSetStr1"));
    assert_eq!(
        session.tree_view().selection().map(|n| n.qualified_name),
        Some("junit.lwe.TP1.testSetStr1".to_string())
    );
    assert_eq!(
        session.outline().selection(),
        Some(DeclarationId::for_member("junit.lwe.TP1", "testSetStr1"))
    );
}

#[test]
fn test_unrelated_file_breaks_until_switching_back() {
    let mut session = session();
    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));

    let outcome = session.browse(A_PATH, None);
    assert_eq!(outcome.status, Some(SyncStatus::Broken));
    assert_eq!(session.editor().active(), Some(PathBuf::from(A_PATH)));
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testGetStr1"));
    assert_eq!(session.view().icon, DEFAULT_BROKEN_ICON);

    let outcome = session.activate_editor(TP1_PATH);
    assert_eq!(outcome.status, Some(SyncStatus::Synced));
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testGetStr1"));
    assert_eq!(session.view().icon, DEFAULT_SYNCED_ICON);
}

#[test]
fn test_failing_run_with_link_disabled_keeps_editor() {
    let mut session = session();
    session.toggle_link(false);
    session.activate_editor(A_PATH);

    let outcome = session.run_completed(tree(true));
    assert!(outcome.commands.is_empty());
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testSetStr1"));
    assert_eq!(session.editor().active(), Some(PathBuf::from(A_PATH)));
    assert_eq!(session.status(), SyncStatus::Broken);
    assert_eq!(session.view().icon, DEFAULT_BROKEN_ICON);
    assert!(!session.view().checked);
}

#[test]
fn test_failing_run_reveals_first_failure() {
    let mut session = session();
    session.activate_editor(A_PATH);

    session.run_completed(tree(true));
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testSetStr1"));
    assert_eq!(session.editor().active(), Some(PathBuf::from(TP1_PATH)));
    assert_eq!(editor_text(&session, TP1), "testSetStr1");
    assert_eq!(session.status(), SyncStatus::Synced);
}

#[test]
fn test_quiet_first_failure_only_selects() {
    let mut config = Config::default();
    config.link.reveal_first_failure = false;
    let mut session = session_with(&config);
    session.activate_editor(A_PATH);

    let outcome = session.run_completed(tree(true));
    assert!(outcome.commands.is_empty());
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testSetStr1"));
    assert_eq!(session.editor().active(), Some(PathBuf::from(A_PATH)));
    assert_eq!(session.status(), SyncStatus::Broken);
}

#[test]
fn test_passing_run_keeps_selection_by_name() {
    let mut session = session();
    session.select_node(node(&session, "junit.lwe.TP2.testGetStr2"));
    let before = session.synchronizer().selected().unwrap();

    session.run_completed(tree(false));
    let after = session.synchronizer().selected().unwrap();
    assert_eq!(after.qualified_name, before.qualified_name);
    assert_ne!(after.generation, before.generation);
    assert_eq!(session.tree_view().selection(), Some(after));
}

#[test]
fn test_open_node_works_when_disabled_and_targets_failure_line() {
    let mut session = session();
    session.run_completed(tree(true));
    session.toggle_link(false);
    session.activate_editor(A_PATH);

    let outcome = session.open_node(&node(&session, "junit.lwe.TP2.testSetStr2"));
    assert_eq!(outcome.commands.len(), 1);
    assert_eq!(session.editor().active(), Some(PathBuf::from(TP2_PATH)));
    assert_eq!(editor_text(&session, TP2).trim(), "assertEquals(\"set\", \"other\");");
    assert_eq!(session.status(), SyncStatus::Synced);
}

#[test]
fn test_outline_selection_does_not_move_caret() {
    let mut session = session();
    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));
    let caret = session.editor().caret(Path::new(TP1_PATH));

    let outcome = session.select_outline(TP1_PATH, DeclarationId::for_member("junit.lwe.TP1", "testSetStr1"));
    assert_eq!(outcome.commands.len(), 1);
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testSetStr1"));
    assert_eq!(session.editor().caret(Path::new(TP1_PATH)), caret);
}

#[test]
fn test_browse_member_opens_at_member() {
    let mut session = session();
    session.browse(TP2_PATH, Some(DeclarationId::for_member("junit.lwe.TP2", "testSetStr2")));
    assert_eq!(editor_text(&session, TP2), "testSetStr2");
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP2.testSetStr2"));
}

#[test]
fn test_browse_file_selects_class() {
    let mut session = session();
    session.browse(TP2_PATH, None);
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP2"));
    assert_eq!(session.status(), SyncStatus::Synced);
}

#[test]
fn test_enabling_link_reevaluates_without_selecting() {
    let mut session = session();
    session.toggle_link(false);
    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));
    session.activate_editor(TP2_PATH);
    assert_eq!(session.status(), SyncStatus::Broken);

    let outcome = session.toggle_link(true);
    assert!(outcome.commands.is_empty());
    assert_eq!(outcome.status, Some(SyncStatus::Broken));
    assert_eq!(selected(&session).as_deref(), Some("junit.lwe.TP1.testGetStr1"));
}

#[test]
fn test_suite_selection_covers_its_classes() {
    let mut session = session();
    session.activate_editor(TP1_PATH);
    session.toggle_link(false);
    session.select_node(node(&session, "JUnit-LWE"));
    assert_eq!(session.status(), SyncStatus::Synced);

    session.activate_editor(A_PATH);
    assert_eq!(session.status(), SyncStatus::Broken);
}

#[test]
fn test_deleted_file_forces_broken() {
    let mut session = session();
    session.editor().delete_file(Path::new(TP1_PATH));

    let outcome = session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));
    assert_eq!(outcome.status, Some(SyncStatus::Broken));
    assert!(outcome.errors.iter().any(|e| e.contains("file not found")));
    assert_eq!(session.view().icon, DEFAULT_BROKEN_ICON);
}

#[test]
fn test_dispatcher_echoes_are_suppressed() {
    let mut session = session();
    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));
    session.select_text(TP1_PATH, range_of(TP1, "testSetStr1"));

    assert_eq!(session.bus().published(), 2);
    // Editor and outline echo the first step, tree and outline the second.
    assert_eq!(session.bus().suppressed(), 4);
}

#[test]
fn test_stale_tree_selection_is_remapped() {
    let mut session = session();
    let stale = node(&session, "junit.lwe.TP2.testGetStr2");
    session.run_completed(tree(false));

    let outcome = session.publish(EventPayload::TreeSelection { node: stale }, Provenance::User);
    assert!(outcome.errors.is_empty());
    let current = session.synchronizer().selected().unwrap();
    assert_eq!(current.generation, session.tree().generation());
    assert_eq!(session.editor().active(), Some(PathBuf::from(TP2_PATH)));
}

#[test]
fn test_edited_source_moves_location() {
    let mut session = session();
    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));

    let edited = format!("// header\n{}", TP1);
    let outcome = session.update_source(Path::new(TP1_PATH), &edited).unwrap();
    assert_eq!(outcome.status, Some(SyncStatus::Synced));

    session.select_node(node(&session, "junit.lwe.TP1.testGetStr1"));
    let caret = session.editor().caret(Path::new(TP1_PATH)).unwrap();
    assert_eq!(caret.start, edited.find("testGetStr1").unwrap());
    assert_eq!(&edited[caret.start..caret.end], "testGetStr1");
}
