//! Tree-sitter utilities shared by declaration parsers.

use tree_sitter::{Language, Node, Parser as TSParser, Tree};

use crate::model::TextRange;

/// Base tree-sitter parser bound to one grammar.
pub struct TreeSitterParser {
    language: Language,
}

impl TreeSitterParser {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Parse source code into a tree-sitter tree.
    pub fn parse_tree(&self, content: &str) -> Result<Tree, String> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| format!("Failed to set language: {}", e))?;

        parser
            .parse(content, None)
            .ok_or_else(|| "Failed to parse content".to_string())
    }

    /// Get text for a node from source content.
    pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
        &content[node.byte_range()]
    }

    /// Byte span of a node.
    pub fn node_range(node: &Node) -> TextRange {
        let range = node.byte_range();
        TextRange::new(range.start, range.end)
    }

    /// Span and text of the `name` field, if the node has one.
    pub fn name_of<'a>(node: &Node, content: &'a str) -> Option<(&'a str, TextRange)> {
        let name = node.child_by_field_name("name")?;
        Some((Self::node_text(&name, content), Self::node_range(&name)))
    }

    /// Find all children of a specific kind.
    pub fn children_of_kind<'a>(node: &Node<'a>, kind: &str) -> Vec<Node<'a>> {
        let mut cursor = node.walk();
        node.children(&mut cursor)
            .filter(|n| n.kind() == kind)
            .collect()
    }
}
