//! Java declaration parser using tree-sitter.

use std::path::Path;
use tree_sitter::Node;

use super::symbols::{FileSymbols, MemberKind, MemberSymbol, TypeKind, TypeSymbol};
use super::traits::DeclarationParser;
use super::treesitter::TreeSitterParser;

/// Java parser using tree-sitter.
pub struct JavaParser {
    base: TreeSitterParser,
}

impl JavaParser {
    pub fn new() -> Self {
        Self {
            base: TreeSitterParser::new(tree_sitter_java::LANGUAGE.into()),
        }
    }

    fn type_kind(kind: &str) -> Option<TypeKind> {
        match kind {
            "class_declaration" => Some(TypeKind::Class),
            "interface_declaration" => Some(TypeKind::Interface),
            "enum_declaration" => Some(TypeKind::Enum),
            "record_declaration" => Some(TypeKind::Record),
            "annotation_type_declaration" => Some(TypeKind::Annotation),
            _ => None,
        }
    }

    fn extract_package(&self, node: &Node, content: &str) -> Option<String> {
        let mut cursor = node.walk();
        let name = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "scoped_identifier" || c.kind() == "identifier")?;
        Some(TreeSitterParser::node_text(&name, content).to_string())
    }

    fn extract_type(&self, node: &Node, content: &str, qualifier: Option<&str>, nested: bool) -> Option<TypeSymbol> {
        let kind = Self::type_kind(node.kind())?;
        let (name, name_range) = TreeSitterParser::name_of(node, content)?;

        // Nested types use the binary-name separator, as test runners report them.
        let qualified_name = match qualifier {
            Some(outer) if nested => format!("{}${}", outer, name),
            Some(package) => format!("{}.{}", package, name),
            None => name.to_string(),
        };

        let mut ty = TypeSymbol {
            qualified_name,
            name: name.to_string(),
            kind,
            range: TreeSitterParser::node_range(node),
            name_range,
            members: Vec::new(),
            nested: Vec::new(),
        };

        if let Some(body) = node.child_by_field_name("body") {
            self.extract_body(&body, content, &mut ty);
        }

        Some(ty)
    }

    fn extract_body(&self, body: &Node, content: &str, ty: &mut TypeSymbol) {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            match child.kind() {
                "method_declaration" | "annotation_type_element_declaration" => {
                    if let Some(member) = self.extract_member(&child, content, MemberKind::Method) {
                        ty.members.push(member);
                    }
                }
                "constructor_declaration" | "compact_constructor_declaration" => {
                    if let Some(member) = self.extract_member(&child, content, MemberKind::Constructor) {
                        ty.members.push(member);
                    }
                }
                "field_declaration" | "constant_declaration" => {
                    ty.members.extend(self.extract_fields(&child, content));
                }
                // Enum members live one level down, after the constants.
                "enum_body_declarations" => self.extract_body(&child, content, ty),
                kind if Self::type_kind(kind).is_some() => {
                    let outer = ty.qualified_name.clone();
                    if let Some(inner) = self.extract_type(&child, content, Some(&outer), true) {
                        ty.nested.push(inner);
                    }
                }
                _ => {}
            }
        }
    }

    fn extract_member(&self, node: &Node, content: &str, kind: MemberKind) -> Option<MemberSymbol> {
        let (name, name_range) = TreeSitterParser::name_of(node, content)?;
        Some(MemberSymbol {
            name: name.to_string(),
            kind,
            range: TreeSitterParser::node_range(node),
            name_range,
        })
    }

    fn extract_fields(&self, node: &Node, content: &str) -> Vec<MemberSymbol> {
        // One declaration may declare several variables; each gets the whole
        // declaration as its range.
        TreeSitterParser::children_of_kind(node, "variable_declarator")
            .iter()
            .filter_map(|decl| TreeSitterParser::name_of(decl, content))
            .map(|(name, name_range)| MemberSymbol {
                name: name.to_string(),
                kind: MemberKind::Field,
                range: TreeSitterParser::node_range(node),
                name_range,
            })
            .collect()
    }
}

impl Default for JavaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationParser for JavaParser {
    fn parse_file(&self, path: &Path, content: &str) -> Result<FileSymbols, String> {
        let tree = self.base.parse_tree(content)?;
        let root = tree.root_node();
        let mut symbols = FileSymbols::new(path, content);

        if root.has_error() {
            symbols
                .warnings
                .push(format!("{}: syntax errors, declarations may be incomplete", path.display()));
        }

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "package_declaration" => {
                    symbols.package = self.extract_package(&child, content);
                }
                "import_declaration" => {
                    symbols.imports.push(TreeSitterParser::node_range(&child));
                }
                _ => {
                    let package = symbols.package.clone();
                    if let Some(ty) = self.extract_type(&child, content, package.as_deref(), false) {
                        symbols.types.push(ty);
                    }
                }
            }
        }

        Ok(symbols)
    }

    fn language_name(&self) -> &'static str {
        "Java"
    }

    fn supported_extensions(&self) -> &[&'static str] {
        &["java"]
    }
}
