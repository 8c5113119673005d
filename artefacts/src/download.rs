//! Release transport.
//!
//! Provides a trait-based abstraction over the release host so that version
//! resolution and bundle retrieval can be exercised without network access.

use log::debug;
use std::io::{Read, Write};
use std::time::Duration;
use ureq::ResponseExt;

/// Default release host for GenVM bundles.
pub const DEFAULT_RELEASE_URL: &str = "https://github.com/genlayerlabs/genvm/releases";

/// File name of the universal bundle asset attached to each release.
pub const BUNDLE_ASSET_NAME: &str = "genvm-universal.tar.xz";

/// Default transport timeout for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const COPY_CHUNK: usize = 64 * 1024;

/// Callback receiving `(bytes_downloaded, total_bytes)`; `total_bytes` is zero
/// when the host does not announce a length.
pub type ProgressFn<'a> = dyn FnMut(u64, u64) + 'a;

/// Transport used to talk to the release host.
pub trait ReleaseClient {
    /// Follows redirects from `url` and returns the final URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn final_url(&self, url: &str) -> Result<String, DownloadError>;

    /// Streams the body at `url` into `dest`, reporting progress as it goes.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or the write fails.
    fn fetch(
        &self,
        url: &str,
        dest: &mut dyn Write,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64, DownloadError>;
}

/// Errors arising from release transport.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested release or asset was not found (HTTP 404).
    #[error("release asset not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded data.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds release URLs relative to a release host.
///
/// # Examples
///
/// ```
/// use genvm_artefacts::download::ReleaseUrls;
/// use genvm_artefacts::VersionTag;
///
/// let urls = ReleaseUrls::new("https://example.test/releases/");
/// let version = VersionTag::new("v0.2.12").expect("valid tag");
/// assert_eq!(urls.latest(), "https://example.test/releases/latest");
/// assert_eq!(
///     urls.bundle(&version),
///     "https://example.test/releases/download/v0.2.12/genvm-universal.tar.xz",
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseUrls {
    base: String,
}

impl ReleaseUrls {
    /// Uses `base` as the release host; trailing slashes are ignored.
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    /// URL that redirects to the newest release.
    #[must_use]
    pub fn latest(&self) -> String {
        format!("{}/latest", self.base)
    }

    /// Download URL of the bundle for `version`.
    #[must_use]
    pub fn bundle(&self, version: &crate::VersionTag) -> String {
        format!("{}/download/{version}/{BUNDLE_ASSET_NAME}", self.base)
    }
}

impl Default for ReleaseUrls {
    fn default() -> Self {
        Self::new(DEFAULT_RELEASE_URL)
    }
}

/// HTTP-based client using `ureq`.
pub struct HttpReleaseClient {
    agent: ureq::Agent,
}

impl HttpReleaseClient {
    /// Creates a client whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpReleaseClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ReleaseClient for HttpReleaseClient {
    fn final_url(&self, url: &str) -> Result<String, DownloadError> {
        let response = self
            .agent
            .head(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let resolved = response.get_uri().to_string();
        debug!("{url} resolved to {resolved}");
        Ok(resolved)
    }

    fn fetch(
        &self,
        url: &str,
        dest: &mut dyn Write,
        progress: &mut ProgressFn<'_>,
    ) -> Result<u64, DownloadError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let total = response
            .headers()
            .get("content-length")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);
        let mut reader = response.into_body().into_reader();
        copy_with_progress(&mut reader, dest, total, progress)
    }
}

/// Copies `reader` into `dest` in chunks, calling `progress` after each one.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] if reading or writing fails.
pub fn copy_with_progress(
    reader: &mut dyn Read,
    dest: &mut dyn Write,
    total: u64,
    progress: &mut ProgressFn<'_>,
) -> Result<u64, DownloadError> {
    let mut buffer = vec![0_u8; COPY_CHUNK];
    let mut written: u64 = 0;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DownloadError::Io(e)),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        dest.write_all(chunk)?;
        written = written.saturating_add(read as u64);
        progress(written, total);
    }
    dest.flush()?;
    Ok(written)
}

/// Last path segment of a URL, ignoring any query string or fragment.
///
/// The scheme and host never count as a segment, so a URL with an empty
/// path yields `None`.
#[must_use]
pub fn last_path_segment(url: &str) -> Option<&str> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let path = match url.split_once("://") {
        Some((_, rest)) => rest
            .find('/')
            .and_then(|start| rest.get(start..))
            .unwrap_or_default(),
        None => url,
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
