use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dispatcher::{SurfaceError, SurfaceHost};
use crate::model::{DeclarationId, Surface};
use crate::sync::Target;

/// Project browser. Only the user selects here; linking never drives it.
#[derive(Debug, Clone, Default)]
pub struct BrowserHost {
    selection: Arc<Mutex<Option<(PathBuf, Option<DeclarationId>)>>>,
}

impl BrowserHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> Option<(PathBuf, Option<DeclarationId>)> {
        self.selection.lock().clone()
    }

    /// User clicks a file or a member below it.
    pub fn select(&self, path: PathBuf, member: Option<DeclarationId>) {
        *self.selection.lock() = Some((path, member));
    }
}

impl SurfaceHost for BrowserHost {
    fn surface(&self) -> Surface {
        Surface::Browser
    }

    fn reveal_and_select(&mut self, target: &Target) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(format!("browser does not follow {}", target)))
    }

    fn shows(&self, _target: &Target) -> bool {
        false
    }
}
