//! Content-addressed component store.
//!
//! Components are extracted from a bundle on first use into
//! `<root>/extracted/<version>/<runner>/<hash>/` and reused verbatim after
//! that. An existing directory is trusted without re-checking the archive.
//!
//! Extraction unpacks into a hidden staging directory beside the target and
//! renames it into place, so a failed or interrupted extraction never leaves
//! a half-populated component behind.

use log::{debug, trace};
use std::io;
use std::path::{Path, PathBuf};

use crate::cache::CacheLayout;
use crate::extraction::{BundleReader, ExtractionError};
use crate::runner_ref::{RunnerRef, is_cache_segment, type_prefix};

/// Errors arising from component extraction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bundle file name does not identify a release version.
    #[error("cannot determine release version from bundle {}", path.display())]
    UnrecognisedBundle {
        /// The bundle path.
        path: PathBuf,
    },

    /// The runner type or hash cannot name a cache directory.
    #[error("refusing to extract {runner_type}:{hash} outside the cache")]
    InvalidComponent {
        /// The requested runner type.
        runner_type: String,
        /// The requested content hash.
        hash: String,
    },

    /// Reading the bundle failed.
    #[error("failed to extract {runner}: {source}")]
    Extraction {
        /// The component being extracted.
        runner: RunnerRef,
        /// The underlying failure.
        #[source]
        source: ExtractionError,
    },

    /// Listing the bundle's members failed.
    #[error("failed to list {runner_type} runners: {source}")]
    Listing {
        /// The runner type being listed.
        runner_type: String,
        /// The underlying failure.
        #[source]
        source: ExtractionError,
    },

    /// Preparing or publishing the component directory failed.
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        /// The directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Chooses the "latest" runner among those present in a bundle.
pub trait LatestRunnerStrategy {
    /// Picks one of `candidates`, or `None` if there are none.
    fn select(&self, candidates: &[RunnerRef]) -> Option<RunnerRef>;
}

/// Picks the runner whose member path sorts last.
///
/// This is a naming heuristic rather than a release-order comparison. It
/// only matches release order while content hashes of newer runners happen
/// to sort after older ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicographicLatest;

impl LatestRunnerStrategy for LexicographicLatest {
    fn select(&self, candidates: &[RunnerRef]) -> Option<RunnerRef> {
        candidates
            .iter()
            .max_by(|a, b| a.member_path().cmp(&b.member_path()))
            .cloned()
    }
}

/// Extracts and caches runner components from bundles.
pub struct ArchiveStore<'a> {
    layout: CacheLayout,
    reader: &'a dyn BundleReader,
    strategy: &'a dyn LatestRunnerStrategy,
}

impl<'a> ArchiveStore<'a> {
    /// Creates a store writing under `layout`.
    #[must_use]
    pub fn new(
        layout: CacheLayout,
        reader: &'a dyn BundleReader,
        strategy: &'a dyn LatestRunnerStrategy,
    ) -> Self {
        Self {
            layout,
            reader,
            strategy,
        }
    }

    /// Returns the directory holding `runner_type`/`hash` from `bundle`,
    /// extracting it first if it is not already cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle name is not recognised, `runner_type`
    /// or `hash` would leave the cache tree, the member is missing or
    /// corrupt, or the cache cannot be written. No component directory is
    /// left behind on failure.
    pub fn extract_component(
        &self,
        bundle: &Path,
        runner_type: &str,
        hash: &str,
    ) -> Result<PathBuf, StoreError> {
        let version = CacheLayout::version_of_bundle(bundle).ok_or_else(|| {
            StoreError::UnrecognisedBundle {
                path: bundle.to_path_buf(),
            }
        })?;
        if !(is_cache_segment(runner_type) && is_cache_segment(hash)) {
            return Err(StoreError::InvalidComponent {
                runner_type: runner_type.to_owned(),
                hash: hash.to_owned(),
            });
        }
        let target = self.layout.component_dir(&version, runner_type, hash);
        if target.is_dir() {
            trace!("reusing extracted {runner_type}:{hash}");
            return Ok(target);
        }

        let runner = RunnerRef::new(runner_type, hash);
        let parent = target.parent().unwrap_or(self.layout.root());
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(parent)
            .map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;

        debug!("extracting {runner} from {}", bundle.display());
        self.reader
            .extract_member(bundle, &runner.member_path(), staging.path())
            .map_err(|source| StoreError::Extraction {
                runner: runner.clone(),
                source,
            })?;

        match std::fs::rename(staging.path(), &target) {
            Ok(()) => Ok(target),
            // Another extraction of the same component won the race.
            Err(_) if target.is_dir() => Ok(target),
            Err(source) => Err(StoreError::Io {
                path: target,
                source,
            }),
        }
    }

    /// Finds the latest runner of `runner_type` in `bundle` according to the
    /// store's [`LatestRunnerStrategy`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be read.
    pub fn find_latest_runner(
        &self,
        bundle: &Path,
        runner_type: &str,
    ) -> Result<Option<RunnerRef>, StoreError> {
        let members = self
            .reader
            .list_members(bundle, &type_prefix(runner_type))
            .map_err(|source| StoreError::Listing {
                runner_type: runner_type.to_owned(),
                source,
            })?;
        let candidates: Vec<RunnerRef> = members
            .iter()
            .filter_map(|member| RunnerRef::from_member_path(runner_type, member))
            .collect();
        let latest = self.strategy.select(&candidates);
        trace!(
            "{} {runner_type} runners in bundle; latest is {latest:?}",
            candidates.len()
        );
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{MockBundleReader, XzBundleReader};
    use crate::test_support::BundleBuilder;
    use rstest::rstest;

    fn bundle_name() -> &'static str {
        "genvm-universal-v0.2.12.tar.xz"
    }

    #[rstest]
    fn lexicographic_strategy_picks_last_member() {
        let candidates = vec![
            RunnerRef::new("py-genlayer", "aa1111"),
            RunnerRef::new("py-genlayer", "zz0000"),
            RunnerRef::new("py-genlayer", "mm5555"),
        ];

        let latest = LexicographicLatest.select(&candidates);

        assert_eq!(latest, Some(RunnerRef::new("py-genlayer", "zz0000")));
    }

    #[rstest]
    fn lexicographic_strategy_handles_empty_input() {
        assert_eq!(LexicographicLatest.select(&[]), None);
    }

    #[rstest]
    fn existing_component_is_reused_without_reading_bundle() {
        let temp = tempfile::tempdir().expect("temp dir");
        let layout = CacheLayout::new(temp.path());
        let bundle = temp.path().join(bundle_name());
        let version = CacheLayout::version_of_bundle(&bundle).expect("named bundle");
        let existing = layout.component_dir(&version, "py-genlayer", "abc123");
        std::fs::create_dir_all(&existing).expect("create component");
        std::fs::write(existing.join("sentinel"), b"kept").expect("write sentinel");
        let mut reader = MockBundleReader::new();
        reader.expect_extract_member().never();
        let store = ArchiveStore::new(layout, &reader, &LexicographicLatest);

        let dir = store
            .extract_component(&bundle, "py-genlayer", "abc123")
            .expect("reuse component");

        assert_eq!(dir, existing);
        assert_eq!(std::fs::read(dir.join("sentinel")).expect("sentinel"), b"kept");
    }

    #[rstest]
    fn extraction_failure_leaves_no_directory() {
        let temp = tempfile::tempdir().expect("temp dir");
        let layout = CacheLayout::new(temp.path().join("cache"));
        let bundle = BundleBuilder::new()
            .raw_component("py-genlayer", "abc123", &[("ok.py", ""), ("../evil.py", "")])
            .write_to(temp.path().join(bundle_name()))
            .expect("write bundle");
        let store = ArchiveStore::new(layout.clone(), &XzBundleReader, &LexicographicLatest);

        let result = store.extract_component(&bundle, "py-genlayer", "abc123");

        assert!(matches!(result, Err(StoreError::Extraction { .. })));
        let version = CacheLayout::version_of_bundle(&bundle).expect("named bundle");
        let target = layout.component_dir(&version, "py-genlayer", "abc123");
        assert!(!target.exists());
        let siblings: Vec<_> = std::fs::read_dir(target.parent().expect("parent"))
            .expect("read parent")
            .collect();
        assert!(siblings.is_empty(), "staging should be removed: {siblings:?}");
    }

    #[rstest]
    fn unnamed_bundle_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir");
        let reader = MockBundleReader::new();
        let store =
            ArchiveStore::new(CacheLayout::new(temp.path()), &reader, &LexicographicLatest);

        let result = store.extract_component(Path::new("/tmp/bundle.tar"), "py-genlayer", "abc");

        assert!(matches!(result, Err(StoreError::UnrecognisedBundle { .. })));
    }

    #[rstest]
    #[case::hash_traversal("py-genlayer", "../../../../outside")]
    #[case::type_traversal("../../outside", "abc123")]
    #[case::empty_hash("py-genlayer", "")]
    fn components_outside_the_cache_are_refused(#[case] runner_type: &str, #[case] hash: &str) {
        let temp = tempfile::tempdir().expect("temp dir");
        let outside = temp.path().join("outside");
        std::fs::create_dir_all(&outside).expect("create outside dir");
        let layout = CacheLayout::new(temp.path().join("cache/a/b"));
        let bundle = temp.path().join(bundle_name());
        let mut reader = MockBundleReader::new();
        reader.expect_extract_member().never();
        let store = ArchiveStore::new(layout, &reader, &LexicographicLatest);

        let result = store.extract_component(&bundle, runner_type, hash);

        assert!(
            matches!(result, Err(StoreError::InvalidComponent { .. })),
            "{result:?}"
        );
    }

    #[rstest]
    fn finds_latest_runner_in_bundle() {
        let temp = tempfile::tempdir().expect("temp dir");
        let bundle = BundleBuilder::new()
            .component("py-lib-protobuf", "aa0001", &[("a.py", "")])
            .component("py-lib-protobuf", "ff0002", &[("a.py", "")])
            .component("py-genlayer", "zz9999", &[("a.py", "")])
            .write_to(temp.path().join(bundle_name()))
            .expect("write bundle");
        let store = ArchiveStore::new(
            CacheLayout::new(temp.path()),
            &XzBundleReader,
            &LexicographicLatest,
        );

        let latest = store
            .find_latest_runner(&bundle, "py-lib-protobuf")
            .expect("list runners");

        assert_eq!(latest, Some(RunnerRef::new("py-lib-protobuf", "ff0002")));
        assert_eq!(
            store
                .find_latest_runner(&bundle, "py-lib-genlayer-embeddings")
                .expect("list runners"),
            None
        );
    }
}
