//! Mapping between test nodes and source declarations.
//!
//! Forward resolution turns a node of the results tree into the declaration
//! it was run from. Reverse resolution turns an editor selection into the
//! node it denotes, if any.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::trace;

use crate::index::{FileSymbols, MemberKind, ProjectIndex, SymbolIndex, TypeSymbol};
use crate::model::{DeclarationId, NodeId, SourceLocation, TestKind, TestTree, TextRange};

/// Forward resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    /// No declaration matches the node. The index may lag behind the tree,
    /// or the node is synthetic.
    #[error("no declaration found for {qualified_name}")]
    NotFound { qualified_name: String },
}

/// Resolves test nodes against a symbol index, caching by qualified name.
#[derive(Debug)]
pub struct SourceLocator<I = ProjectIndex> {
    index: I,
    cache: HashMap<String, SourceLocation>,
}

impl<I: SymbolIndex> SourceLocator<I> {
    pub fn new(index: I) -> Self {
        Self {
            index,
            cache: HashMap::new(),
        }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Mutable access to the index. Files changed through it must be passed
    /// to [`SourceLocator::invalidate_file`].
    pub fn index_mut(&mut self) -> &mut I {
        &mut self.index
    }

    /// Swap the whole index; every cached location is dropped.
    pub fn replace_index(&mut self, index: I) -> I {
        self.cache.clear();
        std::mem::replace(&mut self.index, index)
    }

    /// Forget cached locations inside `file`.
    pub fn invalidate_file(&mut self, file: &Path) {
        let before = self.cache.len();
        self.cache.retain(|_, location| location.file != file);
        trace!(
            file = %file.display(),
            dropped = before - self.cache.len(),
            "invalidated cached locations"
        );
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Declaration a node was run from.
    ///
    /// Methods resolve to their name token, or to their class when the
    /// method is inherited. Classes and suites resolve to the type's name
    /// token.
    pub fn resolve(&mut self, tree: &TestTree, id: NodeId) -> Result<SourceLocation, LocateError> {
        let node = tree.get(id).ok_or_else(|| LocateError::NotFound {
            qualified_name: id.to_string(),
        })?;

        if let Some(hit) = self.cache.get(&node.qualified_name) {
            trace!(name = %node.qualified_name, "location cache hit");
            return Ok(hit.clone());
        }
        trace!(name = %node.qualified_name, "location cache miss");

        let not_found = || LocateError::NotFound {
            qualified_name: node.qualified_name.clone(),
        };

        let location = match node.kind {
            TestKind::Method => {
                let class_name = tree
                    .parent(id)
                    .and_then(|p| tree.get(p))
                    .map(|p| p.qualified_name.as_str())
                    .or_else(|| node.qualified_name.rsplit_once('.').map(|(class, _)| class))
                    .ok_or_else(not_found)?;
                let (file, ty) = self.index.find_type(class_name).ok_or_else(not_found)?;
                match ty.method(&node.name) {
                    Some(method) => Self::location(
                        file,
                        method.range,
                        method.name_range,
                        DeclarationId::for_member(&ty.qualified_name, &method.name),
                    ),
                    None => Self::type_location(file, ty),
                }
            }
            TestKind::Class | TestKind::Suite => {
                let (file, ty) = self.index.find_type(&node.qualified_name).ok_or_else(not_found)?;
                Self::type_location(file, ty)
            }
        };

        self.cache.insert(node.qualified_name.clone(), location.clone());
        Ok(location)
    }

    /// Node denoted by a selection in `file`.
    ///
    /// A selection inside a method declaration denotes that method. Outside
    /// any method, it denotes the class only when it touches the class name
    /// token; imports, fields and other lines denote nothing. Among several
    /// nodes with the same name, the one nearest `anchor` wins.
    pub fn reverse_resolve(
        &self,
        tree: &TestTree,
        file: &Path,
        selection: TextRange,
        anchor: Option<NodeId>,
    ) -> Option<NodeId> {
        let symbols = self.index.file(file)?;
        if symbols.is_import(selection) {
            return None;
        }
        let ty = symbols.innermost_type_at(selection)?;

        let method_hit = ty
            .methods_touching(selection)
            .filter(|m| m.kind == MemberKind::Method)
            .find_map(|m| tree.find_near(&format!("{}.{}", ty.qualified_name, m.name), anchor));
        if method_hit.is_some() {
            return method_hit;
        }

        if ty.name_range.touches(selection) {
            return tree.find_near(&ty.qualified_name, anchor);
        }
        None
    }

    /// Node for a declaration picked in the outline or browser of `file`.
    pub fn resolve_declaration(
        &self,
        tree: &TestTree,
        file: &Path,
        declaration: &DeclarationId,
        anchor: Option<NodeId>,
    ) -> Option<NodeId> {
        let symbols = self.index.file(file)?;
        let ty = symbols.find_type(&declaration.type_name)?;
        if let Some(member) = &declaration.member {
            ty.method(member)?;
        }
        tree.find_near(&declaration.test_name(), anchor)
    }

    /// Location of a declaration inside `file`.
    pub fn declaration_location(&self, file: &Path, declaration: &DeclarationId) -> Option<SourceLocation> {
        let symbols = self.index.file(file)?;
        let ty = symbols.find_type(&declaration.type_name)?;
        match &declaration.member {
            Some(name) => {
                let member = ty.members.iter().find(|m| &m.name == name)?;
                Some(Self::location(
                    symbols,
                    member.range,
                    member.name_range,
                    declaration.clone(),
                ))
            }
            None => Some(Self::type_location(symbols, ty)),
        }
    }

    /// Outline entry matching a node.
    pub fn outline_target(&mut self, tree: &TestTree, id: NodeId) -> Option<DeclarationId> {
        self.resolve(tree, id).ok().map(|location| location.declaration)
    }

    /// Whether any type declared in `file` has a node in the tree.
    pub fn file_has_tests(&self, tree: &TestTree, file: &Path) -> bool {
        self.index.file(file).is_some_and(|symbols| {
            symbols
                .all_types()
                .iter()
                .any(|ty| tree.find(&ty.qualified_name).is_some())
        })
    }

    /// Whether `suite` contains a class declared in `file`.
    pub fn suite_covers_file(&self, tree: &TestTree, suite: NodeId, file: &Path) -> bool {
        let Some(symbols) = self.index.file(file) else {
            return false;
        };
        symbols.all_types().iter().any(|ty| {
            tree.find_all(&ty.qualified_name)
                .iter()
                .any(|&candidate| tree.is_ancestor(suite, candidate))
        })
    }

    /// Where a freshly opened editor on `file` puts its caret: on the name
    /// of the primary type, or at the top for files without types.
    pub fn default_caret(&self, file: &Path) -> TextRange {
        self.index
            .file(file)
            .and_then(|symbols| symbols.primary_type())
            .map(|ty| TextRange::caret(ty.name_range.start))
            .unwrap_or_default()
    }

    /// Where opening `file` from the browser lands: on `member` when the
    /// file declares it, else at `caret`.
    pub fn open_location(&self, file: &Path, member: Option<&DeclarationId>, caret: TextRange) -> SourceLocation {
        member
            .and_then(|m| self.declaration_location(file, m))
            .unwrap_or_else(|| self.file_location(file, caret))
    }

    /// Declaration the outline highlights for an editor selection: the
    /// member around it, else the innermost type. Imports and package lines
    /// have none.
    pub fn declaration_at(&self, file: &Path, selection: TextRange) -> Option<DeclarationId> {
        let symbols = self.index.file(file)?;
        if symbols.is_import(selection) {
            return None;
        }
        let ty = symbols.innermost_type_at(selection)?;
        let declaration = match ty.members.iter().find(|m| m.range.touches(selection)) {
            Some(member) => DeclarationId::for_member(&ty.qualified_name, &member.name),
            None => DeclarationId::for_type(&ty.qualified_name),
        };
        Some(declaration)
    }

    /// Location an editor on `file` shows with `caret`. Works for files the
    /// index does not know.
    pub fn file_location(&self, file: &Path, caret: TextRange) -> SourceLocation {
        let symbols = self.index.file(file);
        let ty = symbols.and_then(|s| s.innermost_type_at(caret).or_else(|| s.primary_type()));
        let declaration = match ty {
            Some(ty) => DeclarationId::for_type(&ty.qualified_name),
            None => DeclarationId::for_type(
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ),
        };
        SourceLocation {
            file: file.to_path_buf(),
            declaration_range: ty.map(|t| t.range).unwrap_or(caret),
            selection_range: caret,
            line: symbols.map(|s| s.line_of(caret.start)).unwrap_or(1),
            declaration,
        }
    }

    /// `location` narrowed to a 1-based line of its file.
    pub fn at_line(&self, location: &SourceLocation, line: u32) -> Option<SourceLocation> {
        let symbols = self.index.file(&location.file)?;
        let range = symbols.line_range(line)?;
        Some(location.with_selection(range, line))
    }

    /// 1-based line of an offset in `file`.
    pub fn line_of(&self, file: &Path, offset: usize) -> Option<u32> {
        self.index.file(file).map(|symbols| symbols.line_of(offset))
    }

    fn type_location(file: &FileSymbols, ty: &TypeSymbol) -> SourceLocation {
        Self::location(
            file,
            ty.range,
            ty.name_range,
            DeclarationId::for_type(&ty.qualified_name),
        )
    }

    fn location(
        file: &FileSymbols,
        declaration_range: TextRange,
        selection_range: TextRange,
        declaration: DeclarationId,
    ) -> SourceLocation {
        SourceLocation {
            file: file.path().to_path_buf(),
            declaration_range,
            selection_range,
            line: file.line_of(selection_range.start),
            declaration,
        }
    }
}
