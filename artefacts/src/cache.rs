//! On-disk cache layout.
//!
//! ```text
//! <root>/genvm-universal-<version>.tar.xz          downloaded bundles
//! <root>/extracted/<version>/<runner>/<hash>/      extracted components
//! ```
//!
//! Entries are never invalidated here; clearing the cache is an external
//! action.

use log::trace;
use std::io;
use std::path::{Path, PathBuf};

use crate::dirs::BaseDirs;
use crate::version::VersionTag;

const BUNDLE_PREFIX: &str = "genvm-universal-";
const BUNDLE_SUFFIX: &str = ".tar.xz";
const EXTRACTED_DIRNAME: &str = "extracted";

/// Errors arising from cache root discovery.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No override was given and the platform cache directory is unknown.
    #[error("could not determine a cache directory; set GENVM_LINT_CACHE_DIR")]
    NoCacheDir,

    /// The cache root could not be created.
    #[error("failed to create cache directory {path}: {source}")]
    CreateFailed {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Path derivation for everything stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    /// Uses `root` as the cache root.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses `override_root` when given, else the platform cache directory.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NoCacheDir`] when neither is available.
    pub fn discover(
        dirs: &dyn BaseDirs,
        override_root: Option<&Path>,
    ) -> Result<Self, CacheError> {
        override_root
            .map(Path::to_path_buf)
            .or_else(|| dirs.cache_dir())
            .map(Self::new)
            .ok_or(CacheError::NoCacheDir)
    }

    /// The cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the cache root if needed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::CreateFailed`] if the directory cannot be created.
    pub fn ensure_root(&self) -> Result<&Path, CacheError> {
        std::fs::create_dir_all(&self.root).map_err(|source| CacheError::CreateFailed {
            path: self.root.clone(),
            source,
        })?;
        Ok(&self.root)
    }

    /// Canonical bundle location for `version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use genvm_artefacts::{CacheLayout, VersionTag};
    ///
    /// let layout = CacheLayout::new("/cache");
    /// let version = VersionTag::new("v0.2.12").expect("valid tag");
    /// assert!(layout
    ///     .bundle_path(&version)
    ///     .ends_with("genvm-universal-v0.2.12.tar.xz"));
    /// ```
    #[must_use]
    pub fn bundle_path(&self, version: &VersionTag) -> PathBuf {
        self.root
            .join(format!("{BUNDLE_PREFIX}{version}{BUNDLE_SUFFIX}"))
    }

    /// Directory holding one extracted component.
    #[must_use]
    pub fn component_dir(&self, version: &VersionTag, runner_type: &str, hash: &str) -> PathBuf {
        self.root
            .join(EXTRACTED_DIRNAME)
            .join(version.as_str())
            .join(runner_type)
            .join(hash)
    }

    /// Recovers the version from a bundle file name.
    #[must_use]
    pub fn version_of_bundle(bundle: &Path) -> Option<VersionTag> {
        let name = bundle.file_name()?.to_str()?;
        let version = name.strip_prefix(BUNDLE_PREFIX)?.strip_suffix(BUNDLE_SUFFIX)?;
        VersionTag::new(version).ok()
    }

    /// Versions with a bundle in the cache, in string order.
    ///
    /// A missing cache root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cache root exists but cannot be read.
    pub fn cached_versions(&self) -> io::Result<Vec<VersionTag>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!("cache root {} does not exist", self.root.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(version) = Self::version_of_bundle(&entry.path()) {
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }
}
