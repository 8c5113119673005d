//! Content-addressed runner identifiers.
//!
//! A runner component lives inside a release bundle at a path derived purely
//! from its type and content hash: the first two characters of the hash name
//! a directory and the remainder names the archive file.

use std::fmt;

const RUNNERS_DIR: &str = "runners";
const MEMBER_SUFFIX: &str = ".tar";

/// One component inside a bundle, identified by runner type and hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunnerRef {
    runner_type: String,
    hash: String,
}

impl RunnerRef {
    /// Builds a reference.
    #[must_use]
    pub fn new(runner_type: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            runner_type: runner_type.into(),
            hash: hash.into(),
        }
    }

    /// Runner type, e.g. `py-lib-genlayer-std`.
    #[must_use]
    pub fn runner_type(&self) -> &str {
        &self.runner_type
    }

    /// Content hash.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Archive member path of this component inside the bundle.
    #[must_use]
    pub fn member_path(&self) -> String {
        member_path(&self.runner_type, &self.hash)
    }

    /// Recombines a member path produced by [`member_path`] into a reference.
    ///
    /// Returns `None` if `member` is not a runner archive of `runner_type`.
    #[must_use]
    pub fn from_member_path(runner_type: &str, member: &str) -> Option<Self> {
        let rest = member
            .strip_prefix(&type_prefix(runner_type))?
            .strip_suffix(MEMBER_SUFFIX)?;
        let (dir, file) = rest.split_once('/')?;
        if file.contains('/') {
            return None;
        }
        Some(Self::new(runner_type, format!("{dir}{file}")))
    }
}

impl fmt::Display for RunnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.runner_type, self.hash)
    }
}

/// Whether `segment` can name one directory level of the cache.
///
/// Runner types are kebab-case words and content hashes are base32, so only
/// ASCII alphanumerics, `-` and `_` are accepted. Separators and dots never
/// are, which keeps `..` and absolute paths out of the cache tree.
///
/// # Examples
///
/// ```
/// use genvm_artefacts::runner_ref::is_cache_segment;
///
/// assert!(is_cache_segment("1j12s63"));
/// assert!(!is_cache_segment("../../outside"));
/// ```
#[must_use]
pub fn is_cache_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
}

/// Prefix shared by every member of one runner type, with trailing slash.
#[must_use]
pub fn type_prefix(runner_type: &str) -> String {
    format!("{RUNNERS_DIR}/{runner_type}/")
}

/// Derives `runners/{type}/{hash[..2]}/{hash[2..]}.tar`.
///
/// Hashes shorter than two characters produce an empty file stem.
///
/// # Examples
///
/// ```
/// use genvm_artefacts::runner_ref::member_path;
///
/// assert_eq!(
///     member_path("py-lib-genlayer-std", "0asq35p8"),
///     "runners/py-lib-genlayer-std/0a/sq35p8.tar",
/// );
/// ```
#[must_use]
pub fn member_path(runner_type: &str, hash: &str) -> String {
    let split = hash.char_indices().nth(2).map_or(hash.len(), |(pos, _)| pos);
    let (dir, file) = hash.split_at(split);
    format!("{}{dir}/{file}{MEMBER_SUFFIX}", type_prefix(runner_type))
}
