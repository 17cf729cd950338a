//! Declaration symbols extracted from one source file.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::model::TextRange;

/// Kind of type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// Kind of type member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
}

/// A method, constructor or field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSymbol {
    pub name: String,
    pub kind: MemberKind,
    /// Whole declaration.
    pub range: TextRange,
    /// Name token.
    pub name_range: TextRange,
}

/// A class, interface, enum, record or annotation type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSymbol {
    /// Package-qualified name; nested types are joined with `$`.
    pub qualified_name: String,
    pub name: String,
    pub kind: TypeKind,
    pub range: TextRange,
    pub name_range: TextRange,
    pub members: Vec<MemberSymbol>,
    pub nested: Vec<TypeSymbol>,
}

impl TypeSymbol {
    /// First method with the given name. Overloads resolve to the first one.
    pub fn method(&self, name: &str) -> Option<&MemberSymbol> {
        self.members
            .iter()
            .find(|m| m.kind == MemberKind::Method && m.name == name)
    }

    /// Methods and constructors touched by a selection, in source order.
    pub fn methods_touching(&self, selection: TextRange) -> impl Iterator<Item = &MemberSymbol> + '_ {
        self.members.iter().filter(move |m| {
            matches!(m.kind, MemberKind::Method | MemberKind::Constructor) && m.range.touches(selection)
        })
    }
}

/// Everything the index knows about one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileSymbols {
    /// Project-relative path.
    pub path: PathBuf,
    pub package: Option<String>,
    pub imports: Vec<TextRange>,
    pub types: Vec<TypeSymbol>,
    /// SHA-256 of the content, hex encoded.
    pub fingerprint: String,
    /// Non-fatal parse problems.
    pub warnings: Vec<String>,
    #[serde(skip)]
    line_starts: Vec<usize>,
    #[serde(skip)]
    len: usize,
}

impl FileSymbols {
    pub fn new(path: impl Into<PathBuf>, content: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            path: path.into(),
            package: None,
            imports: Vec::new(),
            types: Vec::new(),
            fingerprint: compute_hash(content),
            warnings: Vec::new(),
            line_starts,
            len: content.len(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All types including nested ones, outer before inner.
    pub fn all_types(&self) -> Vec<&TypeSymbol> {
        let mut out = Vec::new();
        let mut stack: Vec<&TypeSymbol> = self.types.iter().rev().collect();
        while let Some(ty) = stack.pop() {
            out.push(ty);
            stack.extend(ty.nested.iter().rev());
        }
        out
    }

    pub fn find_type(&self, qualified_name: &str) -> Option<&TypeSymbol> {
        self.all_types()
            .into_iter()
            .find(|t| t.qualified_name == qualified_name)
    }

    /// Deepest type whose declaration the selection touches.
    pub fn innermost_type_at(&self, selection: TextRange) -> Option<&TypeSymbol> {
        let mut found = None;
        let mut level = self.types.as_slice();
        while let Some(ty) = level.iter().find(|t| t.range.touches(selection)) {
            found = Some(ty);
            level = ty.nested.as_slice();
        }
        found
    }

    /// The public type named after the file, else the first declared type.
    pub fn primary_type(&self) -> Option<&TypeSymbol> {
        let stem = self.path.file_stem().and_then(|s| s.to_str());
        self.types
            .iter()
            .find(|t| Some(t.name.as_str()) == stem)
            .or_else(|| self.types.first())
    }

    pub fn is_import(&self, selection: TextRange) -> bool {
        self.imports.iter().any(|r| r.touches(selection))
    }

    /// 1-based line containing `offset`.
    pub fn line_of(&self, offset: usize) -> u32 {
        self.line_starts.partition_point(|&start| start <= offset) as u32
    }

    /// Byte range of a 1-based line, without its newline.
    pub fn line_range(&self, line: u32) -> Option<TextRange> {
        let index = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(index)?;
        let end = self
            .line_starts
            .get(index + 1)
            .map(|next| next - 1)
            .unwrap_or(self.len);
        Some(TextRange::new(start, end))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// SHA-256 of content for change detection.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
