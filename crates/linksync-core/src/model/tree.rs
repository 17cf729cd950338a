//! Arena-backed model of a completed test run.
//!
//! A `TestTree` is built once per run and replaced wholesale by the next one.
//! Nodes reference each other by `NodeId`; parents are non-owning.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use super::event::NodeRef;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Index of a node inside its `TestTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of runnable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Suite,
    Class,
    Method,
}

/// Result reported by the runner for a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    Failed,
    Error,
    Ignored,
    #[default]
    NotRun,
}

impl TestOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }
}

/// A suite, class or method in the results tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNode {
    /// Dotted name: `junit.lwe.TP1` or `junit.lwe.TP1.testGetStr1`.
    pub qualified_name: String,
    /// Label shown in the tree.
    pub name: String,
    pub kind: TestKind,
    pub outcome: TestOutcome,
    /// 1-based line of the failing assertion, when the runner reported one.
    pub failure_line: Option<u32>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Results tree of one test run.
#[derive(Debug, Clone, Default)]
pub struct TestTree {
    generation: u64,
    nodes: Vec<TestNode>,
    root: Option<NodeId>,
    by_name: HashMap<String, Vec<NodeId>>,
}

impl TestTree {
    pub fn builder() -> TestTreeBuilder {
        TestTreeBuilder::default()
    }

    /// Identity of this build. Empty trees have generation 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&TestNode> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Reference suitable for events and commands.
    pub fn node_ref(&self, id: NodeId) -> Option<NodeRef> {
        self.get(id).map(|n| NodeRef {
            generation: self.generation,
            id,
            qualified_name: n.qualified_name.clone(),
        })
    }

    /// Whether `node_ref` was issued by this build.
    pub fn owns(&self, node_ref: &NodeRef) -> bool {
        node_ref.generation == self.generation
            && self
                .get(node_ref.id)
                .is_some_and(|n| n.qualified_name == node_ref.qualified_name)
    }

    /// All nodes with the given qualified name, in pre-order.
    pub fn find_all(&self, qualified_name: &str) -> &[NodeId] {
        self.by_name
            .get(qualified_name)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// First node with the given qualified name, in pre-order.
    pub fn find(&self, qualified_name: &str) -> Option<NodeId> {
        self.find_all(qualified_name).first().copied()
    }

    /// Node with the given name closest to `anchor`.
    ///
    /// The same class can appear under several suites; the candidate sharing
    /// the deepest common ancestor with `anchor` wins, ties go to pre-order.
    pub fn find_near(&self, qualified_name: &str, anchor: Option<NodeId>) -> Option<NodeId> {
        let candidates = self.find_all(qualified_name);
        let anchor = match anchor {
            Some(anchor) if candidates.len() > 1 => anchor,
            _ => return candidates.first().copied(),
        };
        let anchor_path = self.path_from_root(anchor);

        let mut best: Option<(usize, NodeId)> = None;
        for &candidate in candidates {
            let shared = self
                .path_from_root(candidate)
                .iter()
                .zip(anchor_path.iter())
                .take_while(|(a, b)| a == b)
                .count();
            if best.map_or(true, |(depth, _)| shared > depth) {
                best = Some((shared, candidate));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Nearest enclosing class (or the node itself when it is one).
    pub fn enclosing_class(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| self.get(n).is_some_and(|node| node.kind == TestKind::Class))
    }

    /// Nodes in depth-first pre-order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// First failed or errored method in pre-order.
    pub fn first_failure(&self) -> Option<NodeId> {
        self.preorder().into_iter().find(|&id| {
            self.get(id)
                .is_some_and(|n| n.kind == TestKind::Method && n.outcome.is_failure())
        })
    }

    /// Number of failed and errored methods.
    pub fn failure_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == TestKind::Method && n.outcome.is_failure())
            .count()
    }

    fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path: Vec<NodeId> = std::iter::once(id).chain(self.ancestors(id)).collect();
        path.reverse();
        path
    }
}

/// Incremental constructor for a `TestTree`.
///
/// Children can only be attached to nodes the builder already handed out,
/// so the result is always a tree.
#[derive(Debug, Default)]
pub struct TestTreeBuilder {
    nodes: Vec<TestNode>,
    root: Option<NodeId>,
}

impl TestTreeBuilder {
    /// Create the root node. Call once per tree.
    pub fn root(&mut self, qualified_name: impl Into<String>, kind: TestKind) -> NodeId {
        let qualified_name = qualified_name.into();
        let node = TestNode {
            name: qualified_name.clone(),
            qualified_name,
            kind,
            outcome: TestOutcome::NotRun,
            failure_line: None,
            parent: None,
            children: Vec::new(),
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.root = Some(id);
        id
    }

    /// Attach a suite or class under `parent`, labelled by its qualified name.
    pub fn child(&mut self, parent: NodeId, qualified_name: impl Into<String>, kind: TestKind) -> NodeId {
        let qualified_name = qualified_name.into();
        self.push(parent, qualified_name.clone(), qualified_name, kind)
    }

    /// Attach a method under its class; the qualified name is derived.
    pub fn method(&mut self, class: NodeId, method_name: impl Into<String>) -> NodeId {
        let method_name = method_name.into();
        let qualified_name = format!("{}.{}", self.nodes[class.0].qualified_name, method_name);
        self.push(class, qualified_name, method_name, TestKind::Method)
    }

    pub fn outcome(&mut self, id: NodeId, outcome: TestOutcome) -> &mut Self {
        self.nodes[id.0].outcome = outcome;
        self
    }

    pub fn failure_line(&mut self, id: NodeId, line: u32) -> &mut Self {
        self.nodes[id.0].failure_line = Some(line);
        self
    }

    pub fn build(self) -> TestTree {
        let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
        let mut tree = TestTree {
            generation,
            nodes: self.nodes,
            root: self.root,
            by_name: HashMap::new(),
        };
        for id in tree.preorder() {
            let name = tree.nodes[id.0].qualified_name.clone();
            tree.by_name.entry(name).or_default().push(id);
        }
        tree
    }

    fn push(&mut self, parent: NodeId, qualified_name: String, name: String, kind: TestKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TestNode {
            qualified_name,
            name,
            kind,
            outcome: TestOutcome::NotRun,
            failure_line: None,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}
