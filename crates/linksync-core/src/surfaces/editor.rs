use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dispatcher::{SurfaceError, SurfaceHost};
use crate::model::{EventPayload, SourceLocation, Surface, TextRange};
use crate::sync::Target;

#[derive(Debug, Default)]
struct EditorModel {
    /// Open editors and their carets, in opening order.
    open: Vec<PathBuf>,
    carets: HashMap<PathBuf, TextRange>,
    active: Option<PathBuf>,
    /// Files that no longer exist on disk.
    deleted: HashSet<PathBuf>,
    echoes: Vec<EventPayload>,
}

impl EditorModel {
    fn show(&mut self, file: &Path, caret: TextRange) {
        if !self.open.iter().any(|f| f == file) {
            self.open.push(file.to_path_buf());
        }
        self.carets.insert(file.to_path_buf(), caret);
        self.active = Some(file.to_path_buf());
    }
}

/// Editor area: open files, one of them active, a caret per file.
#[derive(Debug, Clone, Default)]
pub struct EditorHost {
    inner: Arc<Mutex<EditorModel>>,
}

impl EditorHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<PathBuf> {
        self.inner.lock().active.clone()
    }

    pub fn caret(&self, file: &Path) -> Option<TextRange> {
        self.inner.lock().carets.get(file).copied()
    }

    pub fn is_open(&self, file: &Path) -> bool {
        self.inner.lock().open.iter().any(|f| f == file)
    }

    pub fn open_files(&self) -> Vec<PathBuf> {
        self.inner.lock().open.clone()
    }

    /// User switches to (or opens) `file`. Returns the caret the editor has.
    pub fn activate(&self, file: &Path, default_caret: TextRange) -> TextRange {
        let mut model = self.inner.lock();
        let caret = model.carets.get(file).copied().unwrap_or(default_caret);
        model.show(file, caret);
        caret
    }

    /// User moves the caret or selects text.
    pub fn set_caret(&self, file: &Path, range: TextRange) {
        self.inner.lock().show(file, range);
    }

    /// User closes an editor. The most recently opened remaining one
    /// becomes active.
    pub fn close(&self, file: &Path) -> Option<PathBuf> {
        let mut model = self.inner.lock();
        model.open.retain(|f| f != file);
        model.carets.remove(file);
        if model.active.as_deref() == Some(file) {
            model.active = model.open.last().cloned();
        }
        model.active.clone()
    }

    /// Simulate the file disappearing from disk.
    pub fn delete_file(&self, file: &Path) {
        self.inner.lock().deleted.insert(file.to_path_buf());
    }
}

impl SurfaceHost for EditorHost {
    fn surface(&self) -> Surface {
        Surface::Editor
    }

    fn reveal_and_select(&mut self, target: &Target) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(format!("editor cannot select {}", target)))
    }

    fn open(&mut self, location: &SourceLocation) -> Result<(), SurfaceError> {
        let mut model = self.inner.lock();
        if model.deleted.contains(&location.file) {
            return Err(SurfaceError::FileNotFound(location.file.display().to_string()));
        }
        model.show(&location.file, location.selection_range);
        model.echoes.push(EventPayload::EditorCaret {
            file: location.file.clone(),
            range: location.selection_range,
        });
        Ok(())
    }

    fn shows(&self, _target: &Target) -> bool {
        false
    }

    fn is_open_at(&self, location: &SourceLocation) -> bool {
        let model = self.inner.lock();
        model.active.as_deref() == Some(location.file.as_path())
            && model.carets.get(&location.file) == Some(&location.selection_range)
    }

    fn take_echoes(&mut self) -> Vec<EventPayload> {
        std::mem::take(&mut self.inner.lock().echoes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeclarationId;

    fn location(file: &str, start: usize) -> SourceLocation {
        SourceLocation {
            file: PathBuf::from(file),
            declaration_range: TextRange::new(0, 100),
            selection_range: TextRange::new(start, start + 3),
            line: 1,
            declaration: DeclarationId::for_type("a.B"),
        }
    }

    #[test]
    fn test_open_records_caret_and_echo() {
        let mut host = EditorHost::new();
        let handle = host.clone();
        host.open(&location("B.java", 10)).unwrap();
        assert_eq!(handle.active(), Some(PathBuf::from("B.java")));
        assert!(host.is_open_at(&location("B.java", 10)));
        assert!(!host.is_open_at(&location("B.java", 11)));
        assert_eq!(host.take_echoes().len(), 1);
        assert!(host.take_echoes().is_empty());
    }

    #[test]
    fn test_open_deleted_file_fails() {
        let mut host = EditorHost::new();
        host.delete_file(Path::new("B.java"));
        let err = host.open(&location("B.java", 10)).unwrap_err();
        assert!(matches!(err, SurfaceError::FileNotFound(_)));
    }

    #[test]
    fn test_close_activates_previous_editor() {
        let host = EditorHost::new();
        host.activate(Path::new("A.java"), TextRange::caret(0));
        host.activate(Path::new("B.java"), TextRange::caret(0));
        assert_eq!(host.close(Path::new("B.java")), Some(PathBuf::from("A.java")));
        assert_eq!(host.close(Path::new("A.java")), None);
    }
}
