//! SDK component resolution for a contract.
//!
//! Resolution walks a fixed chain: the core runner named in the contract
//! header (or the latest one in the bundle), the standard library pinned by
//! that runner's manifest, the shared protobuf library if the bundle has one,
//! and the embeddings extension when the header asks for it.

use log::debug;
use std::path::{Path, PathBuf};

use crate::header::{CORE_RUNNER, ContractHeader};
use crate::manifest::{DependencyManifest, ManifestError};
use crate::runner_ref::RunnerRef;
use crate::store::{ArchiveStore, StoreError};

/// Standard library component pinned by the core runner.
pub const STD_RUNNER: &str = "py-lib-genlayer-std";
/// Shared protobuf library, included when present.
pub const PROTOBUF_RUNNER: &str = "py-lib-protobuf";
/// Embeddings extension, included only on request.
pub const EMBEDDINGS_RUNNER: &str = "py-lib-genlayer-embeddings";

/// Errors arising from SDK resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The header names no core runner and the bundle contains none.
    #[error("could not find {CORE_RUNNER} in release")]
    MissingCoreRunner,

    /// The core runner's manifest does not pin the standard library.
    #[error("{runner} runner doesn't specify {STD_RUNNER}")]
    MissingStdPin {
        /// The core runner whose manifest was read.
        runner: RunnerRef,
    },

    /// Extracting or listing components failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The core runner's manifest could not be read.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Resolves and extracts the SDK components `header` needs from `bundle`.
///
/// Returns component directories in search order, foundational first.
///
/// # Errors
///
/// Returns an error if the core runner cannot be found, its manifest does
/// not pin the standard library, or any extraction fails.
pub fn resolve_sdk_paths(
    store: &ArchiveStore<'_>,
    bundle: &Path,
    header: &ContractHeader,
) -> Result<Vec<PathBuf>, ResolveError> {
    let core = match header.get(CORE_RUNNER) {
        Some(hash) => RunnerRef::new(CORE_RUNNER, hash),
        None => store
            .find_latest_runner(bundle, CORE_RUNNER)?
            .ok_or(ResolveError::MissingCoreRunner)?,
    };
    debug!("core runner {core}");
    let core_dir = store.extract_component(bundle, core.runner_type(), core.hash())?;

    let manifest = DependencyManifest::load(&core_dir)?;
    let std = manifest
        .get(STD_RUNNER)
        .ok_or_else(|| ResolveError::MissingStdPin {
            runner: core.clone(),
        })?;
    let mut paths = vec![store.extract_component(bundle, STD_RUNNER, std.hash())?];

    if let Some(protobuf) = store.find_latest_runner(bundle, PROTOBUF_RUNNER)? {
        debug!("including {protobuf}");
        paths.push(store.extract_component(bundle, PROTOBUF_RUNNER, protobuf.hash())?);
    }

    if let Some(hash) = header.get(EMBEDDINGS_RUNNER) {
        debug!("including {EMBEDDINGS_RUNNER}:{hash}");
        paths.push(store.extract_component(bundle, EMBEDDINGS_RUNNER, hash)?);
    }

    Ok(paths)
}
