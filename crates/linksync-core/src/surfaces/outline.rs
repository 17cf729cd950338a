use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dispatcher::{SurfaceError, SurfaceHost};
use crate::model::{DeclarationId, EventPayload, Surface};
use crate::sync::Target;

#[derive(Debug, Default)]
struct OutlineModel {
    file: Option<PathBuf>,
    selection: Option<DeclarationId>,
    echoes: Vec<EventPayload>,
}

/// Outline of the active editor's file.
#[derive(Debug, Clone, Default)]
pub struct OutlineHost {
    inner: Arc<Mutex<OutlineModel>>,
}

impl OutlineHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<PathBuf> {
        self.inner.lock().file.clone()
    }

    pub fn selection(&self) -> Option<DeclarationId> {
        self.inner.lock().selection.clone()
    }

    /// Track the editor: show `file` and highlight the declaration under
    /// its caret, or nothing.
    pub fn follow(&self, file: Option<PathBuf>, declaration: Option<DeclarationId>) {
        let mut model = self.inner.lock();
        model.file = file;
        model.selection = declaration;
    }

    /// User clicks an entry.
    pub fn select(&self, file: PathBuf, declaration: DeclarationId) {
        let mut model = self.inner.lock();
        model.file = Some(file);
        model.selection = Some(declaration);
    }
}

impl SurfaceHost for OutlineHost {
    fn surface(&self) -> Surface {
        Surface::Outline
    }

    fn reveal_and_select(&mut self, target: &Target) -> Result<(), SurfaceError> {
        match target {
            Target::Declaration { file, declaration } => {
                let mut model = self.inner.lock();
                model.file = Some(file.clone());
                model.selection = Some(declaration.clone());
                model.echoes.push(EventPayload::OutlineSelection {
                    file: file.clone(),
                    declaration: declaration.clone(),
                });
                Ok(())
            }
            other => Err(SurfaceError::UnknownTarget(other.to_string())),
        }
    }

    fn shows(&self, target: &Target) -> bool {
        match target {
            Target::Declaration { file, declaration } => {
                let model = self.inner.lock();
                model.file.as_ref() == Some(file) && model.selection.as_ref() == Some(declaration)
            }
            _ => false,
        }
    }

    fn take_echoes(&mut self) -> Vec<EventPayload> {
        std::mem::take(&mut self.inner.lock().echoes)
    }
}
