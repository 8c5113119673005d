//! Linter configuration.
//!
//! Settings come from `genvm-lint.toml`: the path given with `--config`, or
//! the file of that name in the working directory when present. Environment
//! variables override the file so CI can redirect the cache or pin a release
//! without editing it.

use camino::{Utf8Path, Utf8PathBuf};
use genvm_artefacts::download::DEFAULT_RELEASE_URL;
use log::debug;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "genvm-lint.toml";

/// Overrides the cache root.
pub const CACHE_DIR_ENV: &str = "GENVM_LINT_CACHE_DIR";

/// Pins the GenVM release.
pub const VERSION_ENV: &str = "GENVM_LINT_VERSION";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// TOML parser error.
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level settings.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LinterConfig {
    /// Cache root for bundles and extracted components. Defaults to the
    /// platform cache directory.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Release to validate against instead of the latest one.
    pub genvm_version: Option<String>,
    /// Base URL of the release host.
    pub release_url: String,
    /// Transport timeout for version lookups and downloads.
    pub download_timeout_secs: u64,
    /// Lint settings.
    pub lint: LintConfig,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            genvm_version: None,
            release_url: DEFAULT_RELEASE_URL.to_owned(),
            download_timeout_secs: 300,
            lint: LintConfig::default(),
        }
    }
}

/// Settings under `[lint]`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Codes dropped from lint results.
    pub exclude_rules: Vec<String>,
    /// Third-party modules the sandbox accepts without finding them on the
    /// SDK search path.
    pub extra_allowed_modules: Vec<String>,
}

impl LinterConfig {
    /// Loads configuration from `explicit`, else from [`CONFIG_FILE_NAME`]
    /// in the working directory, else defaults, then applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a configuration file exists but cannot be
    /// read or parsed. An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, |name| std::env::var(name).ok())
    }

    /// Like [`Self::load`], reading overrides through `env`.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn load_with<F>(explicit: Option<&Utf8Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = Utf8Path::new(CONFIG_FILE_NAME);
                if local.is_file() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(env);
        Ok(config)
    }

    /// Parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        debug!("loading configuration from {path}");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        if let Some(dir) = set(CACHE_DIR_ENV) {
            self.cache_dir = Some(Utf8PathBuf::from(dir));
        }
        if let Some(version) = set(VERSION_ENV) {
            self.genvm_version = Some(version);
        }
    }

    /// Transport timeout as a [`Duration`].
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
