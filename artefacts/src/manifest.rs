//! Runner manifest (`runner.json`) parsing.
//!
//! Each extracted component may ship a `runner.json` whose `Seq` array pins
//! the exact hashes of the components it depends on.

use log::warn;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::runner_ref::RunnerRef;

/// Manifest file name inside a component directory.
pub const MANIFEST_FILE: &str = "runner.json";

/// Errors arising from manifest loading.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The manifest path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The manifest is not valid JSON of the expected shape.
    #[error("invalid runner manifest {}: {source}", path.display())]
    Parse {
        /// The manifest path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(rename = "Seq", default)]
    seq: Vec<RawAction>,
}

#[derive(Deserialize)]
struct RawAction {
    #[serde(rename = "Depends")]
    depends: Option<String>,
}

/// Dependencies pinned by a component's manifest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyManifest {
    pins: BTreeMap<String, RunnerRef>,
}

impl DependencyManifest {
    /// Parses manifest JSON. `Seq` entries other than `Depends` are ignored,
    /// as are `Depends` values without a `:` separator.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if `json` is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use genvm_artefacts::manifest::DependencyManifest;
    ///
    /// let manifest = DependencyManifest::from_json(
    ///     r#"{"Seq":[{"Depends":"py-lib-genlayer-std:0asq35"},{"SetArgs":["x"]}]}"#,
    /// )
    /// .expect("valid manifest");
    /// assert_eq!(
    ///     manifest.get("py-lib-genlayer-std").map(|r| r.hash()),
    ///     Some("0asq35"),
    /// );
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawManifest = serde_json::from_str(json)?;
        let pins = raw
            .seq
            .into_iter()
            .filter_map(|action| action.depends)
            .filter_map(|dep| {
                let (name, hash) = dep.rsplit_once(':')?;
                Some((name.to_owned(), RunnerRef::new(name, hash)))
            })
            .collect();
        Ok(Self { pins })
    }

    /// Loads `runner.json` from `component_dir`. A missing manifest yields an
    /// empty set of pins.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest exists but cannot be read or parsed.
    pub fn load(component_dir: &Path) -> Result<Self, ManifestError> {
        let path = component_dir.join(MANIFEST_FILE);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("{} has no {MANIFEST_FILE}", component_dir.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ManifestError::Read { path, source }),
        };
        Self::from_json(&json).map_err(|source| ManifestError::Parse { path, source })
    }

    /// The pinned component for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RunnerRef> {
        self.pins.get(name)
    }

    /// Number of pinned components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    /// Whether nothing is pinned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
