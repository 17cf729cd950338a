//! Default values for linksync configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Link Defaults
// ============================================================================

/// Whether linking is on when a session starts.
pub const DEFAULT_LINK_ENABLED: bool = true;

/// Whether the runner's first-failure selection drives the editor.
///
/// `false` gives the classic IDE behaviour: the first failure is selected
/// in the tree only, so an unrelated editor left open when the run ends
/// shows BROKEN.
pub const DEFAULT_REVEAL_FIRST_FAILURE: bool = true;

// ============================================================================
// Indicator Defaults
// ============================================================================

/// Icon shown while the editor matches the selected test.
pub const DEFAULT_SYNCED_ICON: &str = "synced.gif";

/// Icon shown when the editor and the selected test disagree.
pub const DEFAULT_BROKEN_ICON: &str = "sync_broken.gif";

pub const DEFAULT_SYNCED_TOOLTIP: &str = "Link with Editor";

pub const DEFAULT_BROKEN_TOOLTIP: &str = "Link with Editor (the active editor does not match the selected test)";

/// Whether the broken icon is shown while linking is off.
pub const DEFAULT_SHOW_BROKEN_WHEN_DISABLED: bool = true;

// ============================================================================
// Index Defaults
// ============================================================================

/// Source extensions indexed for declarations.
pub const DEFAULT_EXTENSIONS: &[&str] = &["java"];

/// Directories never indexed.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Build outputs
    "target",
    "build",
    "bin",
    "out",
    ".gradle",
    // IDE metadata
    ".idea",
    ".settings",
    ".metadata",
];

/// Files larger than this are skipped (1 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Whether `.gitignore` rules apply while walking a project.
pub const DEFAULT_RESPECT_GITIGNORE: bool = true;

// ============================================================================
// File Names
// ============================================================================

/// Project-local configuration file.
pub const PROJECT_CONFIG_FILE: &str = "linksync.toml";

/// Directory under the user config dir.
pub const USER_CONFIG_DIR: &str = "linksync";

/// File name inside `USER_CONFIG_DIR`.
pub const USER_CONFIG_FILE: &str = "config.toml";
