//! Version resolution and cached bundle retrieval.
//!
//! A bundle is downloaded at most once per version. Downloads are staged in
//! a temporary file beside the cache entry and only moved into place once
//! complete, so the canonical path never holds a partial bundle.

use log::{debug, info};
use std::io;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::cache::{CacheError, CacheLayout};
use crate::download::{
    DownloadError, ProgressFn, ReleaseClient, ReleaseUrls, last_path_segment,
};
use crate::version::{VersionError, VersionTag};

/// Errors arising from bundle retrieval.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The transport failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The cache root could not be prepared.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The latest-release redirect did not end in a usable tag.
    #[error("could not determine latest version from {url}")]
    UnresolvedLatest {
        /// The final redirect target.
        url: String,
        /// Why the last path segment was rejected, if it was present.
        #[source]
        source: Option<VersionError>,
    },

    /// The downloaded bundle could not be moved into the cache.
    #[error("failed to store bundle at {path}: {source}")]
    Persist {
        /// The canonical bundle path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Resolves versions and ensures bundles are present in the local cache.
pub struct ReleaseFetcher<'a> {
    client: &'a dyn ReleaseClient,
    layout: CacheLayout,
    urls: ReleaseUrls,
}

impl<'a> ReleaseFetcher<'a> {
    /// Creates a fetcher storing bundles under `layout`.
    #[must_use]
    pub fn new(client: &'a dyn ReleaseClient, layout: CacheLayout, urls: ReleaseUrls) -> Self {
        Self {
            client,
            layout,
            urls,
        }
    }

    /// The cache layout bundles are stored under.
    #[must_use]
    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Resolves the newest release tag by following the `latest` redirect.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the final URL does not end
    /// in a valid tag.
    pub fn resolve_latest_version(&self) -> Result<VersionTag, FetchError> {
        let url = self.client.final_url(&self.urls.latest())?;
        let Some(segment) = last_path_segment(&url) else {
            return Err(FetchError::UnresolvedLatest { url, source: None });
        };
        match VersionTag::new(segment) {
            Ok(version) => {
                debug!("latest GenVM release is {version}");
                Ok(version)
            }
            Err(e) => Err(FetchError::UnresolvedLatest {
                url,
                source: Some(e),
            }),
        }
    }

    /// Returns the cached bundle for `version`, downloading it if absent.
    ///
    /// With no version, "latest" is resolved first. A bundle already present
    /// at its canonical path is returned without any network access.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution, download, or persisting fails. No
    /// partial file is left at the canonical path.
    pub fn ensure_bundle(
        &self,
        version: Option<&VersionTag>,
        on_progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<PathBuf, FetchError> {
        let version = match version {
            Some(version) => version.clone(),
            None => self.resolve_latest_version()?,
        };
        let path = self.layout.bundle_path(&version);
        if path.is_file() {
            debug!("using cached bundle {}", path.display());
            return Ok(path);
        }

        let root = self.layout.ensure_root()?;
        let url = self.urls.bundle(&version);
        info!("downloading GenVM {version} from {url}");

        // Dropping the staging file on any error removes it.
        let mut staging = NamedTempFile::new_in(root).map_err(DownloadError::Io)?;
        let mut ignore = |_: u64, _: u64| {};
        let progress: &mut ProgressFn<'_> = match on_progress {
            Some(callback) => callback,
            None => &mut ignore,
        };
        let bytes = self.client.fetch(&url, staging.as_file_mut(), progress)?;
        staging
            .persist(&path)
            .map_err(|e| FetchError::Persist {
                path: path.clone(),
                source: e.error,
            })?;
        debug!("stored {bytes} bytes at {}", path.display());
        Ok(path)
    }

    /// Versions already present in the cache, in string order.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cache root cannot be read.
    pub fn list_cached_versions(&self) -> io::Result<Vec<VersionTag>> {
        self.layout.cached_versions()
    }
}
