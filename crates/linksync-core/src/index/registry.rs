//! Parser registry for managing language-specific declaration parsers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::java::JavaParser;
use super::traits::DeclarationParser;

/// Registry of declaration parsers.
///
/// Maps file extensions to their respective parsers.
/// Registers the built-in parsers on creation.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn DeclarationParser>>,
}

impl ParserRegistry {
    /// Create a new registry with all built-in parsers.
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };
        registry.register(Arc::new(JavaParser::new()));
        registry
    }

    /// Register a parser for its supported extensions.
    pub fn register(&mut self, parser: Arc<dyn DeclarationParser>) {
        for ext in parser.supported_extensions() {
            self.parsers.insert(ext.to_lowercase(), Arc::clone(&parser));
        }
    }

    /// Get a parser for the given file extension.
    pub fn parser_for_extension(&self, extension: &str) -> Option<Arc<dyn DeclarationParser>> {
        self.parsers.get(&extension.to_lowercase()).cloned()
    }

    /// Get a parser for the given file path.
    pub fn parser_for_path(&self, path: &Path) -> Option<Arc<dyn DeclarationParser>> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|ext| self.parser_for_extension(ext))
    }

    /// List all supported extensions.
    pub fn supported_extensions(&self) -> Vec<&str> {
        self.parsers.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("extensions", &self.supported_extensions())
            .finish()
    }
}
