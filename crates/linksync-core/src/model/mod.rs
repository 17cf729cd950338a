//! Data model shared by every component.

mod event;
mod location;
mod tree;

pub use event::{EventPayload, NodeRef, Provenance, SelectionEvent, Surface};
pub use location::{DeclarationId, SourceLocation, TextRange};
pub use tree::{NodeId, TestKind, TestNode, TestOutcome, TestTree, TestTreeBuilder};
