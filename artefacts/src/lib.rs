//! GenVM release artefact handling for `genvm-lint`.
//!
//! This crate fetches versioned GenVM release bundles, extracts individual
//! content-addressed runner components from them into a local cache, and
//! resolves the set of SDK components a contract needs from its dependency
//! header.
//!
//! # Modules
//!
//! - [`cache`] - On-disk cache layout for bundles and extracted components
//! - [`dirs`] - Platform directory discovery abstraction
//! - [`download`] - Transport trait and `ureq`-backed HTTP implementation
//! - [`extraction`] - Nested archive extraction with path traversal protection
//! - [`header`] - Contract dependency header parsing
//! - [`manifest`] - Runner manifest (`runner.json`) parsing
//! - [`release`] - Version resolution and cached bundle retrieval
//! - [`resolver`] - SDK component resolution for a contract
//! - [`runner_ref`] - Content-addressed runner identifiers
//! - [`store`] - Content-addressed component extraction and caching
//! - [`version`] - Release version tags

pub mod cache;
pub mod dirs;
pub mod download;
pub mod extraction;
pub mod header;
pub mod manifest;
pub mod release;
pub mod resolver;
pub mod runner_ref;
pub mod store;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use cache::CacheLayout;
pub use header::ContractHeader;
pub use release::ReleaseFetcher;
pub use resolver::{ResolveError, resolve_sdk_paths};
pub use runner_ref::RunnerRef;
pub use store::ArchiveStore;
pub use version::VersionTag;
