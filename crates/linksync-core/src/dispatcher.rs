//! Command dispatcher.
//!
//! Applies synchronizer commands to the registered surface hosts. A command
//! whose target is already shown is skipped, so replaying the same commands
//! leaves every surface as it was. The dispatcher never publishes events.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{trace, warn};

use crate::model::{EventPayload, SourceLocation, Surface};
use crate::sync::{Command, Target};

/// Why a surface rejected a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("target not shown by this surface: {0}")]
    UnknownTarget(String),

    #[error("unsupported command: {0}")]
    Unsupported(String),
}

/// A view commands can be applied to.
pub trait SurfaceHost: Send {
    fn surface(&self) -> Surface;

    /// Scroll to `target` and make it the selection.
    fn reveal_and_select(&mut self, target: &Target) -> Result<(), SurfaceError>;

    /// Open `location` and select its selection span.
    fn open(&mut self, location: &SourceLocation) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(format!(
            "{} cannot open {}",
            self.surface(),
            location.file.display()
        )))
    }

    /// Whether `target` is already the selection.
    fn shows(&self, target: &Target) -> bool;

    /// Whether `location` is already open with its span selected.
    fn is_open_at(&self, _location: &SourceLocation) -> bool {
        false
    }

    /// Selection events the host raised while applying commands. They are
    /// published with dispatcher provenance.
    fn take_echoes(&mut self) -> Vec<EventPayload> {
        Vec::new()
    }
}

/// A command a surface rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchFailure {
    pub command: Command,
    pub error: SurfaceError,
}

/// What happened to a batch of commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub applied: usize,
    /// Already in the requested state.
    pub skipped: usize,
    pub failed: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Routes commands to surface hosts.
#[derive(Default)]
pub struct CommandDispatcher {
    hosts: HashMap<Surface, Box<dyn SurfaceHost>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host, replacing any previous host of the same surface.
    pub fn register(&mut self, host: Box<dyn SurfaceHost>) -> Option<Box<dyn SurfaceHost>> {
        self.hosts.insert(host.surface(), host)
    }

    pub fn host(&self, surface: Surface) -> Option<&dyn SurfaceHost> {
        self.hosts.get(&surface).map(|h| h.as_ref())
    }

    pub fn host_mut(&mut self, surface: Surface) -> Option<&mut (dyn SurfaceHost + 'static)> {
        self.hosts.get_mut(&surface).map(|h| h.as_mut())
    }

    /// Apply commands in order. A failure does not stop later commands.
    pub fn dispatch(&mut self, commands: &[Command]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for command in commands {
            let Some(host) = self.hosts.get_mut(&command.surface()) else {
                trace!(%command, "no host registered, skipping");
                report.skipped += 1;
                continue;
            };

            let result = match command {
                Command::Open { location, .. } => {
                    if host.is_open_at(location) {
                        report.skipped += 1;
                        continue;
                    }
                    host.open(location)
                }
                Command::RevealAndSelect { target, .. } => {
                    if host.shows(target) {
                        report.skipped += 1;
                        continue;
                    }
                    host.reveal_and_select(target)
                }
            };

            match result {
                Ok(()) => {
                    trace!(%command, "applied");
                    report.applied += 1;
                }
                Err(error) => {
                    warn!(%command, %error, "surface rejected command");
                    report.failed.push(DispatchFailure {
                        command: command.clone(),
                        error,
                    });
                }
            }
        }

        report
    }

    /// Echo events produced by every host since the last call.
    pub fn take_echoes(&mut self) -> Vec<EventPayload> {
        self.hosts
            .values_mut()
            .flat_map(|host| host.take_echoes())
            .collect()
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut surfaces: Vec<_> = self.hosts.keys().map(|s| s.to_string()).collect();
        surfaces.sort();
        f.debug_struct("CommandDispatcher")
            .field("surfaces", &surfaces)
            .finish()
    }
}
