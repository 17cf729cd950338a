//! Declared-symbol index.
//!
//! Parses project sources into declaration spans (types, members, imports and
//! name tokens) that the locator maps test nodes onto. Parsing is done with
//! tree-sitter; each file keeps a content fingerprint so a refresh can tell
//! which files actually changed.

mod error;
mod java;
mod project;
mod registry;
mod symbols;
mod traits;
mod treesitter;

pub use error::IndexError;
pub use java::JavaParser;
pub use project::{IndexStats, ProjectIndex};
pub use registry::ParserRegistry;
pub use symbols::{compute_hash, FileSymbols, MemberKind, MemberSymbol, TypeKind, TypeSymbol};
pub use traits::{DeclarationParser, SymbolIndex};
pub use treesitter::TreeSitterParser;
