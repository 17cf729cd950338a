//! On-disk project index.

use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::error::IndexError;
use super::registry::ParserRegistry;
use super::symbols::{FileSymbols, MemberKind};
use super::traits::SymbolIndex;
use crate::config::IndexConfig;

/// Statistics about an index build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Number of indexed files.
    pub files: usize,
    /// Number of type declarations, nested ones included.
    pub types: usize,
    /// Number of method declarations.
    pub methods: usize,
    /// Files skipped because they were too large or unreadable.
    pub skipped: usize,
    /// Total size of indexed files in bytes.
    pub total_size: u64,
}

/// Declared-symbol index of a project, keyed by project-relative path.
#[derive(Debug, Clone)]
pub struct ProjectIndex {
    root: PathBuf,
    files: HashMap<PathBuf, FileSymbols>,
    types: HashMap<String, PathBuf>,
    parsers: ParserRegistry,
}

impl ProjectIndex {
    /// Create an empty index rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: HashMap::new(),
            types: HashMap::new(),
            parsers: ParserRegistry::new(),
        }
    }

    /// Walk `root` and index every matching source file.
    pub fn from_dir(root: impl Into<PathBuf>, config: &IndexConfig) -> Result<(Self, IndexStats), IndexError> {
        let mut index = Self::new(root);
        let mut stats = IndexStats::default();

        for (relative, content) in index.walk(config, &mut stats)? {
            stats.total_size += content.len() as u64;
            index.update_source(relative, &content)?;
            stats.files += 1;
        }

        for file in index.files.values() {
            for ty in file.all_types() {
                stats.types += 1;
                stats.methods += ty
                    .members
                    .iter()
                    .filter(|m| m.kind == MemberKind::Method)
                    .count();
            }
        }

        debug!(
            root = %index.root.display(),
            files = stats.files,
            types = stats.types,
            skipped = stats.skipped,
            "indexed project"
        );
        Ok((index, stats))
    }

    /// Build an index from in-memory sources.
    pub fn from_sources<P, S, I>(root: impl Into<PathBuf>, sources: I) -> Result<Self, IndexError>
    where
        P: Into<PathBuf>,
        S: AsRef<str>,
        I: IntoIterator<Item = (P, S)>,
    {
        let mut index = Self::new(root);
        for (path, content) in sources {
            index.update_source(path, content.as_ref())?;
        }
        Ok(index)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Parse `content` as the new text of `path`.
    ///
    /// Returns `true` when the file is new or its fingerprint changed.
    pub fn update_source(&mut self, path: impl Into<PathBuf>, content: &str) -> Result<bool, IndexError> {
        let path = self.relativize(&path.into());
        let parser = self
            .parsers
            .parser_for_path(&path)
            .ok_or_else(|| IndexError::Unsupported(path.clone()))?;

        if let Some(existing) = self.files.get(&path) {
            if existing.fingerprint == super::symbols::compute_hash(content) {
                trace!(path = %path.display(), "fingerprint unchanged");
                return Ok(false);
            }
        }

        let symbols = parser
            .parse_file(&path, content)
            .map_err(|message| IndexError::Parse {
                path: path.clone(),
                message,
            })?;
        for warning in &symbols.warnings {
            warn!("{}", warning);
        }

        self.remove_file(&path);
        for ty in symbols.all_types() {
            self.types.insert(ty.qualified_name.clone(), path.clone());
        }
        self.files.insert(path, symbols);
        Ok(true)
    }

    /// Drop a file and the types it declared. Returns whether it was indexed.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        let path = self.relativize(path);
        match self.files.remove(&path) {
            Some(old) => {
                for ty in old.all_types() {
                    if self.types.get(&ty.qualified_name) == Some(&path) {
                        self.types.remove(&ty.qualified_name);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Re-walk the project and pick up added, edited and deleted files.
    ///
    /// Returns the project-relative paths whose symbols changed.
    pub fn refresh(&mut self, config: &IndexConfig) -> Result<Vec<PathBuf>, IndexError> {
        let mut stats = IndexStats::default();
        let mut seen = HashSet::new();
        let mut changed = Vec::new();

        for (relative, content) in self.walk(config, &mut stats)? {
            seen.insert(relative.clone());
            if self.update_source(relative.clone(), &content)? {
                changed.push(relative);
            }
        }

        let removed: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|p| !seen.contains(*p))
            .cloned()
            .collect();
        for path in removed {
            self.remove_file(&path);
            changed.push(path);
        }

        changed.sort();
        debug!(changed = changed.len(), "refreshed project index");
        Ok(changed)
    }

    /// Map an absolute path under the root onto its index key.
    pub fn relativize(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    fn walk(&self, config: &IndexConfig, stats: &mut IndexStats) -> Result<Vec<(PathBuf, String)>, IndexError> {
        if !self.root.is_dir() {
            return Err(IndexError::io(
                &self.root,
                std::io::Error::new(std::io::ErrorKind::NotFound, "project root is not a directory"),
            ));
        }

        let excluded = config.clone();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(config.respect_gitignore)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(is_dir && entry.file_name().to_str().is_some_and(|n| excluded.excludes_dir(n)))
            })
            .build();

        let mut sources = Vec::new();
        for entry in walker {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !config.accepts(path) {
                continue;
            }
            let relative = self.relativize(path);

            let metadata = fs::metadata(path).map_err(|e| IndexError::io(path, e))?;
            if metadata.len() > config.max_file_size {
                trace!(path = %relative.display(), size = metadata.len(), "skipping large file");
                stats.skipped += 1;
                continue;
            }

            match fs::read_to_string(path) {
                Ok(content) => sources.push((relative, content)),
                Err(e) => {
                    warn!("Failed to read {}: {}", relative.display(), e);
                    stats.skipped += 1;
                }
            }
        }
        sources.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(sources)
    }
}

impl SymbolIndex for ProjectIndex {
    fn file(&self, path: &Path) -> Option<&FileSymbols> {
        self.files
            .get(path)
            .or_else(|| self.files.get(&self.relativize(path)))
    }

    fn file_declaring(&self, qualified_name: &str) -> Option<&Path> {
        self.types.get(qualified_name).map(|p| p.as_path())
    }

    fn files(&self) -> Box<dyn Iterator<Item = &FileSymbols> + '_> {
        Box::new(self.files.values())
    }
}
