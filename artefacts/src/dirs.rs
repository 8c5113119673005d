//! Platform directory discovery.
//!
//! Wraps `directories-next` behind a trait so cache placement can be tested
//! without touching the real home directory.

use directories_next::ProjectDirs;
use std::path::PathBuf;

/// Directory name used under the platform cache root.
pub const APPLICATION_NAME: &str = "genvm-linter";

/// Source of platform-specific base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The per-user cache directory for this tool, e.g.
    /// `~/.cache/genvm-linter` on Linux.
    fn cache_dir(&self) -> Option<PathBuf>;
}

/// Production implementation backed by `directories-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        ProjectDirs::from("", "", APPLICATION_NAME).map(|dirs| dirs.cache_dir().to_path_buf())
    }
}
