//! Seams between the index, its parsers and the locator.

use std::path::Path;

use super::symbols::{FileSymbols, TypeSymbol};

/// Language-specific declaration extractor.
///
/// Implementations turn one source file into the declaration spans the
/// locator needs: types, their members, imports and name tokens.
///
/// # Example Implementation
///
/// ```ignore
/// impl DeclarationParser for JavaParser {
///     fn parse_file(&self, path: &Path, content: &str) -> Result<FileSymbols, String> {
///         let tree = self.base.parse_tree(content)?;
///         // Walk type declarations and collect members...
///     }
///
///     fn language_name(&self) -> &'static str { "Java" }
///     fn supported_extensions(&self) -> &[&'static str] { &["java"] }
/// }
/// ```
pub trait DeclarationParser: Send + Sync {
    /// Parse a source file.
    ///
    /// # Arguments
    /// * `path` - Project-relative path, recorded in the result
    /// * `content` - Source code content
    fn parse_file(&self, path: &Path, content: &str) -> Result<FileSymbols, String>;

    /// Human-readable language name.
    fn language_name(&self) -> &'static str;

    /// File extensions this parser handles.
    fn supported_extensions(&self) -> &[&'static str];

    /// Check if this parser can handle the given file extension.
    fn can_parse(&self, extension: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// The project's declared-symbol index as seen by the locator.
///
/// Lookups never block; an index that has not caught up with the sources
/// simply answers `None`.
pub trait SymbolIndex: Send + Sync {
    /// Symbols of a project-relative file.
    fn file(&self, path: &Path) -> Option<&FileSymbols>;

    /// File declaring the type with this qualified name.
    fn file_declaring(&self, qualified_name: &str) -> Option<&Path>;

    /// Every indexed file.
    fn files(&self) -> Box<dyn Iterator<Item = &FileSymbols> + '_>;

    /// File and declaration of a type.
    fn find_type(&self, qualified_name: &str) -> Option<(&FileSymbols, &TypeSymbol)> {
        let path = self.file_declaring(qualified_name)?;
        let file = self.file(path)?;
        let ty = file.find_type(qualified_name)?;
        Some((file, ty))
    }
}
