//! In-memory surface hosts.
//!
//! Each host is a cheap `Clone` handle onto shared state: one clone is
//! registered with the dispatcher, others stay with whoever needs to look at
//! or drive the surface. Applying a command records an echo event, which the
//! session publishes with dispatcher provenance.

mod browser;
mod editor;
mod outline;
mod tree;

pub use browser::BrowserHost;
pub use editor::EditorHost;
pub use outline::OutlineHost;
pub use tree::ResultsTreeHost;
