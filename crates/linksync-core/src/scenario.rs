//! Declarative link sessions.
//!
//! A scenario describes a results tree, a list of user actions and the state
//! expected after them. Scenarios are YAML:
//!
//! ```yaml
//! name: caret follows into tree
//! tree:
//!   name: JUnit-LWE
//!   children:
//!     - name: junit.lwe.TP1
//!       children:
//!         - name: testGetStr1
//!         - name: testSetStr1
//! steps:
//!   - select_tree: junit.lwe.TP1.testGetStr1
//!   - select_text: { file: src/junit/lwe/TP1.java, text: testSetStr1 }
//!   - expect: { status: synced, selected: junit.lwe.TP1.testSetStr1 }
//! ```
//!
//! Sources come from the project directory, or inline from `sources`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::index::{IndexError, ProjectIndex, SymbolIndex};
use crate::indicator::IndicatorView;
use crate::model::{DeclarationId, NodeId, TestKind, TestOutcome, TestTree, TestTreeBuilder, TextRange};
use crate::session::{LinkSession, SessionOutcome};
use crate::sync::SyncStatus;

/// Scenario errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Step {step}: no test node named {name}")]
    UnknownNode { step: usize, name: String },

    #[error("Step {step}: {} is not part of the project", file.display())]
    UnknownFile { step: usize, file: PathBuf },

    #[error("Step {step}: {text:?} not found in {}", file.display())]
    UnknownText { step: usize, file: PathBuf, text: String },

    #[error("Step {step}: {message}")]
    Expectation { step: usize, message: String },
}

/// A node of the scenario's results tree.
///
/// Methods are named relative to their class; suites and classes carry
/// qualified names. Without an explicit `kind`, leaves are methods, parents
/// of leaves are classes and everything above is a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TestKind>,
    #[serde(default)]
    pub outcome: TestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

impl NodeSpec {
    fn kind(&self) -> TestKind {
        self.kind.unwrap_or_else(|| {
            if self.children.is_empty() {
                TestKind::Method
            } else if self.children.iter().all(|c| c.children.is_empty()) {
                TestKind::Class
            } else {
                TestKind::Suite
            }
        })
    }

    /// Build a fresh tree; every call yields a new generation.
    pub fn build(&self) -> TestTree {
        let mut builder = TestTree::builder();
        let kind = match self.kind() {
            TestKind::Method => TestKind::Suite,
            kind => kind,
        };
        let root = builder.root(&self.name, kind);
        self.decorate(&mut builder, root);
        for child in &self.children {
            child.attach(&mut builder, root);
        }
        builder.build()
    }

    fn attach(&self, builder: &mut TestTreeBuilder, parent: NodeId) {
        let id = match self.kind() {
            TestKind::Method => builder.method(parent, &self.name),
            kind => builder.child(parent, &self.name, kind),
        };
        self.decorate(builder, id);
        for child in &self.children {
            child.attach(builder, id);
        }
    }

    fn decorate(&self, builder: &mut TestTreeBuilder, id: NodeId) {
        builder.outcome(id, self.outcome);
        if let Some(line) = self.failure_line {
            builder.failure_line(id, line);
        }
    }
}

/// Text to select in a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSpec {
    pub file: PathBuf,
    pub text: String,
    /// Which occurrence, starting at 1.
    #[serde(default = "first")]
    pub occurrence: usize,
    /// Place a caret at the start instead of selecting the text.
    #[serde(default)]
    pub caret: bool,
}

fn first() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSpec {
    pub file: PathBuf,
    pub line: u32,
}

/// A declaration in a file, for outline and browser steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationSpec {
    #[serde(alias = "path")]
    pub file: PathBuf,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

/// State checked by an `expect` step. Absent fields are not checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    #[serde(default)]
    pub status: Option<SyncStatus>,
    /// Qualified name of the selected tree node, `none` for no selection.
    #[serde(default)]
    pub selected: Option<String>,
    /// Active editor file, `none` for no editor.
    #[serde(default)]
    pub editor: Option<String>,
    /// Text under the editor selection of the active file.
    #[serde(default)]
    pub editor_text: Option<String>,
    /// 1-based line of the editor caret.
    #[serde(default)]
    pub editor_line: Option<u32>,
    /// Outline selection as `type#member`, `none` for no selection.
    #[serde(default)]
    pub outline: Option<String>,
    /// Commands emitted by the previous step.
    #[serde(default)]
    pub commands: Option<usize>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub link_enabled: Option<bool>,
}

/// One scenario step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SelectTree(String),
    SelectText(TextSpec),
    SelectLine(LineSpec),
    Activate(PathBuf),
    Close(PathBuf),
    Open(String),
    Outline(DeclarationSpec),
    Browse(DeclarationSpec),
    ToggleLink(bool),
    /// Rebuild the tree, from the scenario's tree when `None`.
    Run(Option<NodeSpec>),
    Expect(Expectation),
}

impl Step {
    fn label(&self) -> String {
        match self {
            Self::SelectTree(name) => format!("select {} in tree", name),
            Self::SelectText(t) => format!("select {:?} in {}", t.text, t.file.display()),
            Self::SelectLine(l) => format!("select line {} of {}", l.line, l.file.display()),
            Self::Activate(file) => format!("activate {}", file.display()),
            Self::Close(file) => format!("close {}", file.display()),
            Self::Open(name) => format!("open {}", name),
            Self::Outline(d) => format!("outline {}", d.file.display()),
            Self::Browse(d) => format!("browse {}", d.file.display()),
            Self::ToggleLink(on) => format!("toggle link {}", if *on { "on" } else { "off" }),
            Self::Run(_) => "run tests".to_string(),
            Self::Expect(_) => "expect".to_string(),
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Initial link state; the configuration decides when absent.
    #[serde(default)]
    pub link_enabled: Option<bool>,
    /// Project-relative path to content. Replaces reading from disk.
    #[serde(default)]
    pub sources: BTreeMap<PathBuf, String>,
    pub tree: NodeSpec,
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_yaml(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}

/// Report of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub action: String,
    pub outcome: SessionOutcome,
    pub status: SyncStatus,
}

/// Report of a whole scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepReport>,
    pub view: IndicatorView,
    pub expectations: usize,
}

/// Replays scenarios against a project.
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    project: PathBuf,
    config: Config,
}

impl ScenarioRunner {
    pub fn new(project: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            project: project.into(),
            config,
        }
    }

    /// Run every step, stopping at the first failure.
    pub fn run(&self, scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
        let index = if scenario.sources.is_empty() {
            ProjectIndex::from_dir(&self.project, &self.config.index)?.0
        } else {
            ProjectIndex::from_sources(&self.project, scenario.sources.iter().map(|(p, c)| (p.clone(), c.as_str())))?
        };

        let mut config = self.config.clone();
        if let Some(enabled) = scenario.link_enabled {
            config.link.enabled = enabled;
        }
        let mut session = LinkSession::new(index, &config);
        session.run_completed(scenario.tree.build());

        info!(name = %scenario.name, steps = scenario.steps.len(), "running scenario");
        let mut steps = Vec::new();
        let mut last = SessionOutcome::default();
        let mut expectations = 0;

        for (i, step) in scenario.steps.iter().enumerate() {
            let number = i + 1;
            if let Step::Expect(expected) = step {
                self.check(scenario, &session, &last, expected, number)?;
                expectations += 1;
                continue;
            }

            last = self.execute(scenario, &mut session, step, number)?;
            debug!(step = number, action = %step.label(), status = %session.status(), "step done");
            steps.push(StepReport {
                step: number,
                action: step.label(),
                outcome: last.clone(),
                status: session.status(),
            });
        }

        Ok(ScenarioReport {
            name: scenario.name.clone(),
            steps,
            view: session.view().clone(),
            expectations,
        })
    }

    fn execute(
        &self,
        scenario: &Scenario,
        session: &mut LinkSession,
        step: &Step,
        number: usize,
    ) -> Result<SessionOutcome, ScenarioError> {
        let unknown_node = |name: &str| ScenarioError::UnknownNode {
            step: number,
            name: name.to_string(),
        };

        let outcome = match step {
            Step::SelectTree(name) => {
                let node = session.node(name).ok_or_else(|| unknown_node(name))?;
                session.select_node(node)
            }
            Step::Open(name) => {
                let node = session.node(name).ok_or_else(|| unknown_node(name))?;
                session.open_node(&node)
            }
            Step::SelectText(spec) => {
                let content = self.content(scenario, &spec.file, number)?;
                let start = content
                    .match_indices(&spec.text)
                    .nth(spec.occurrence.saturating_sub(1))
                    .map(|(at, _)| at)
                    .ok_or_else(|| ScenarioError::UnknownText {
                        step: number,
                        file: spec.file.clone(),
                        text: spec.text.clone(),
                    })?;
                let range = if spec.caret {
                    TextRange::caret(start)
                } else {
                    TextRange::new(start, start + spec.text.len())
                };
                session.select_text(spec.file.clone(), range)
            }
            Step::SelectLine(spec) => session
                .select_line(spec.file.clone(), spec.line)
                .ok_or_else(|| ScenarioError::UnknownFile {
                    step: number,
                    file: spec.file.clone(),
                })?,
            Step::Activate(file) => session.activate_editor(file.clone()),
            Step::Close(file) => session.close_editor(file.clone()),
            Step::Outline(spec) => {
                let declaration = Self::declaration(session, spec, number)?;
                session.select_outline(spec.file.clone(), declaration)
            }
            Step::Browse(spec) => {
                let member = if spec.type_name.is_some() || spec.member.is_some() {
                    Some(Self::declaration(session, spec, number)?)
                } else {
                    None
                };
                session.browse(spec.file.clone(), member)
            }
            Step::ToggleLink(enable) => session.toggle_link(*enable),
            Step::Run(tree) => {
                let tree = tree.as_ref().unwrap_or(&scenario.tree).build();
                session.run_completed(tree)
            }
            Step::Expect(_) => SessionOutcome::default(),
        };
        Ok(outcome)
    }

    /// Declaration named by a step; the type defaults to the file's primary type.
    fn declaration(
        session: &LinkSession,
        spec: &DeclarationSpec,
        number: usize,
    ) -> Result<DeclarationId, ScenarioError> {
        let type_name = match &spec.type_name {
            Some(name) => name.clone(),
            None => session
                .synchronizer()
                .locator()
                .index()
                .file(&spec.file)
                .and_then(|f| f.primary_type())
                .map(|t| t.qualified_name.clone())
                .ok_or_else(|| ScenarioError::UnknownFile {
                    step: number,
                    file: spec.file.clone(),
                })?,
        };
        Ok(DeclarationId {
            type_name,
            member: spec.member.clone(),
        })
    }

    fn content(&self, scenario: &Scenario, file: &Path, number: usize) -> Result<String, ScenarioError> {
        if let Some(content) = scenario.sources.get(file) {
            return Ok(content.clone());
        }
        if !scenario.sources.is_empty() {
            return Err(ScenarioError::UnknownFile {
                step: number,
                file: file.to_path_buf(),
            });
        }
        let path = self.project.join(file);
        fs::read_to_string(&path).map_err(|source| ScenarioError::Io { path, source })
    }

    fn check(
        &self,
        scenario: &Scenario,
        session: &LinkSession,
        last: &SessionOutcome,
        expected: &Expectation,
        number: usize,
    ) -> Result<(), ScenarioError> {
        let fail = |message: String| Err(ScenarioError::Expectation { step: number, message });

        if let Some(status) = expected.status {
            if session.status() != status {
                return fail(format!("expected status {}, got {}", status, session.status()));
            }
        }

        if let Some(selected) = &expected.selected {
            let actual = session.synchronizer().selected_node().map(|n| n.qualified_name.clone());
            if !matches_optional(selected, actual.as_deref()) {
                return fail(format!("expected selection {}, got {:?}", selected, actual));
            }
            let shown = session.tree_view().selection().map(|n| n.qualified_name);
            if shown != actual {
                return fail(format!("tree view shows {:?}, synchronizer has {:?}", shown, actual));
            }
        }

        let active = session.editor().active();
        if let Some(editor) = &expected.editor {
            let actual = active.as_ref().map(|p| p.display().to_string());
            if !matches_optional(editor, actual.as_deref()) {
                return fail(format!("expected editor {}, got {:?}", editor, actual));
            }
        }

        if expected.editor_text.is_some() || expected.editor_line.is_some() {
            let Some(file) = &active else {
                return fail("no active editor".to_string());
            };
            let caret = session.editor().caret(file).unwrap_or_default();
            if let Some(text) = &expected.editor_text {
                let content = self.content(scenario, file, number)?;
                let actual = content.get(caret.start..caret.end).unwrap_or_default();
                if actual != text {
                    return fail(format!("expected editor selection {:?}, got {:?}", text, actual));
                }
            }
            if let Some(line) = expected.editor_line {
                let actual = session.synchronizer().locator().line_of(file, caret.start);
                if actual != Some(line) {
                    return fail(format!("expected editor line {}, got {:?}", line, actual));
                }
            }
        }

        if let Some(outline) = &expected.outline {
            let actual = session.outline().selection().map(|d| d.to_string());
            if !matches_optional(outline, actual.as_deref()) {
                return fail(format!("expected outline {}, got {:?}", outline, actual));
            }
        }

        if let Some(count) = expected.commands {
            if last.commands.len() != count {
                return fail(format!(
                    "expected {} commands from the previous step, got {}",
                    count,
                    last.commands.len()
                ));
            }
        }

        if let Some(icon) = &expected.icon {
            if &session.view().icon != icon {
                return fail(format!("expected icon {}, got {}", icon, session.view().icon));
            }
        }

        if let Some(enabled) = expected.link_enabled {
            if session.is_enabled() != enabled {
                return fail(format!("expected link enabled = {}", enabled));
            }
        }

        Ok(())
    }
}

/// `none` matches an absent value; anything else must be equal.
fn matches_optional(expected: &str, actual: Option<&str>) -> bool {
    match actual {
        None => expected == "none",
        Some(actual) => expected == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_inference() {
        let spec: NodeSpec = serde_yaml::from_str(
            "
name: All
children:
  - name: a.B
    children:
      - name: testX
        outcome: failed
        failure_line: 4
",
        )
        .unwrap();
        let tree = spec.build();
        let root = tree.get(tree.root().unwrap()).unwrap();
        assert_eq!(root.kind, TestKind::Suite);
        let class = tree.get(tree.find("a.B").unwrap()).unwrap();
        assert_eq!(class.kind, TestKind::Class);
        let method = tree.get(tree.find("a.B.testX").unwrap()).unwrap();
        assert_eq!(method.kind, TestKind::Method);
        assert_eq!(method.failure_line, Some(4));
        assert_eq!(tree.first_failure(), tree.find("a.B.testX"));
    }

    #[test]
    fn test_steps_parse_as_singleton_maps() {
        let scenario = Scenario::from_yaml(
            "
tree: { name: All }
steps:
  - select_tree: a.B.testX
  - select_text: { file: B.java, text: testX }
  - toggle_link: false
  - run: ~
  - expect: { status: broken, selected: none }
",
        )
        .unwrap();
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(&scenario.steps[1], Step::SelectText(t) if t.occurrence == 1 && !t.caret));
        assert!(matches!(scenario.steps[3], Step::Run(None)));
        assert!(matches!(&scenario.steps[4], Step::Expect(e) if e.status == Some(SyncStatus::Broken)));
    }

    #[test]
    fn test_matches_optional() {
        assert!(matches_optional("none", None));
        assert!(matches_optional("a.B", Some("a.B")));
        assert!(!matches_optional("a.B", None));
    }
}
