//! Source positions shared by the index, the locator and the surfaces.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Half-open byte range `[start, end)` into a source file.
///
/// An empty range is a plain caret offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// An empty range at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `offset` lies in `[start, end)`.
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether `other` lies completely inside this range.
    pub fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether a selection touches this range.
    ///
    /// A caret touches a range when it sits anywhere from its first character
    /// up to just after its last one; a non-empty selection touches it when
    /// the two share at least one byte.
    pub fn touches(&self, selection: TextRange) -> bool {
        if selection.is_empty() {
            self.start <= selection.start && selection.start <= self.end
        } else {
            selection.start < self.end && self.start < selection.end
        }
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Stable identifier of a declaration inside a file, as shown by the outline
/// and the project browser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclarationId {
    /// Qualified name of the declaring type (`junit.lwe.TP1`, nested types use `$`).
    pub type_name: String,
    /// Member name for methods and fields, `None` for the type itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl DeclarationId {
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            member: None,
        }
    }

    pub fn for_member(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            member: Some(member.into()),
        }
    }

    /// Qualified name of the test element this declaration would map to.
    pub fn test_name(&self) -> String {
        match &self.member {
            Some(member) => format!("{}.{}", self.type_name, member),
            None => self.type_name.clone(),
        }
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{}#{}", self.type_name, member),
            None => write!(f, "{}", self.type_name),
        }
    }
}

/// Resolved position of a test element in source.
///
/// Immutable once produced by the locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Project-relative file path.
    pub file: PathBuf,
    /// Whole declaration, modifiers through closing brace.
    pub declaration_range: TextRange,
    /// Sub-span to highlight, usually the name token.
    pub selection_range: TextRange,
    /// 1-based line of `selection_range.start`.
    pub line: u32,
    /// Outline identifier of the declaration.
    pub declaration: DeclarationId,
}

impl SourceLocation {
    /// Same location with a different highlighted span.
    pub fn with_selection(&self, selection_range: TextRange, line: u32) -> Self {
        Self {
            selection_range,
            line,
            ..self.clone()
        }
    }
}
