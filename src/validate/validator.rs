//! Validation pipeline: SDK retrieval, contract loading, and reflection.
//!
//! Each stage converts its own failure into a single coded
//! [`ValidationError`]; the first failing stage ends the run.

use camino::Utf8Path;
use genvm_artefacts::download::ProgressFn;
use genvm_artefacts::release::FetchError;
use genvm_artefacts::{ArchiveStore, ContractHeader, ReleaseFetcher, ResolveError, VersionTag};
use genvm_lint_common::{ErrorCode, ValidationError, ValidationResult};
use log::debug;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use super::host::{HostCapabilities, ReflectionHost};
use super::reflect::{ReflectError, SchemaReflector, SdkReflector};
use super::sandbox::{LoadError, SandboxEnvironment, SandboxError, find_contract_class};

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static LINE_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'line':\s*(\d+)").expect("valid line pattern"));

/// Failure to make the SDK importable.
#[derive(Debug, Error)]
pub enum SdkLoadError {
    /// The release bundle could not be obtained.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// SDK components could not be resolved or extracted.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The extracted components do not form a usable SDK.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// Runs the validation stages against one release cache.
pub struct Validator<'a> {
    fetcher: &'a ReleaseFetcher<'a>,
    store: &'a ArchiveStore<'a>,
    version: Option<VersionTag>,
    host: &'a dyn HostCapabilities,
    reflector: &'a dyn SchemaReflector,
    extra_modules: Vec<String>,
}

impl<'a> Validator<'a> {
    /// A validator using the latest release, reflection-only host bindings,
    /// and the declaration-driven reflector.
    #[must_use]
    pub fn new(fetcher: &'a ReleaseFetcher<'a>, store: &'a ArchiveStore<'a>) -> Self {
        Self {
            fetcher,
            store,
            version: None,
            host: &ReflectionHost,
            reflector: &SdkReflector,
            extra_modules: Vec::new(),
        }
    }

    /// Pins the release instead of resolving "latest".
    #[must_use]
    pub fn with_version(mut self, version: Option<VersionTag>) -> Self {
        self.version = version;
        self
    }

    /// Replaces the host bindings handed to the reflector.
    #[must_use]
    pub fn with_host(mut self, host: &'a dyn HostCapabilities) -> Self {
        self.host = host;
        self
    }

    /// Replaces the schema reflector.
    #[must_use]
    pub fn with_reflector(mut self, reflector: &'a dyn SchemaReflector) -> Self {
        self.reflector = reflector;
        self
    }

    /// Third-party modules that resolve without a search-path hit.
    #[must_use]
    pub fn with_extra_modules(mut self, modules: Vec<String>) -> Self {
        self.extra_modules = modules;
        self
    }

    /// Validates the contract at `path`.
    ///
    /// `on_progress` receives download progress if the bundle has to be
    /// fetched.
    #[must_use]
    pub fn validate(
        &self,
        path: &Utf8Path,
        on_progress: Option<&mut ProgressFn<'_>>,
    ) -> ValidationResult {
        match self.run(path, on_progress) {
            Ok(result) => result,
            Err(error) => ValidationResult::failure(error),
        }
    }

    fn run(
        &self,
        path: &Utf8Path,
        on_progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<ValidationResult, ValidationError> {
        if !path.exists() {
            return Err(ValidationError::new(
                ErrorCode::ContractNotFound,
                format!("Contract not found: {path}"),
            ));
        }
        let source = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::new(ErrorCode::ContractLoad, format!("Failed to load contract: {e}"))
        })?;

        let header = ContractHeader::parse(&source);
        let environment = self.load_sdk(&header, on_progress).map_err(|e| {
            ValidationError::new(ErrorCode::SdkLoad, format!("Failed to load SDK: {e}"))
        })?;

        let contract = environment
            .load_source(path.as_std_path(), source)
            .map_err(load_error)?;

        let class = find_contract_class(contract.module()).ok_or_else(|| {
            ValidationError::new(ErrorCode::NoContractClass, "No contract class found")
        })?;
        debug!("reflecting over {}", class.name());

        let schema = self
            .reflector
            .get_schema(&contract, class, environment.host())
            .map_err(reflect_error)?;
        Ok(ValidationResult::success(class.name(), schema))
    }

    /// Ensures the bundle, resolves the contract's SDK components, and builds
    /// the import environment over them.
    ///
    /// # Errors
    ///
    /// Returns [`SdkLoadError`] for any fetch, resolution, or environment
    /// failure.
    pub fn load_sdk(
        &self,
        header: &ContractHeader,
        on_progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<SandboxEnvironment<'a>, SdkLoadError> {
        let bundle = self
            .fetcher
            .ensure_bundle(self.version.as_ref(), on_progress)?;
        let components = genvm_artefacts::resolve_sdk_paths(self.store, &bundle, header)?;
        Ok(SandboxEnvironment::prepare(
            &components,
            self.host,
            &self.extra_modules,
        )?)
    }
}

fn load_error(error: LoadError) -> ValidationError {
    match error {
        LoadError::Syntax(e) => {
            ValidationError::new(ErrorCode::Syntax, format!("Syntax error: {}", e.message()))
                .at_line(e.line())
        }
        e @ LoadError::Import { .. } => {
            ValidationError::new(ErrorCode::Import, format!("Import error: {e}"))
        }
        e @ LoadError::Read { .. } => {
            ValidationError::new(ErrorCode::ContractLoad, format!("Failed to load contract: {e}"))
        }
    }
}

fn reflect_error(error: ReflectError) -> ValidationError {
    match error {
        ReflectError::Type { message } => {
            let error =
                ValidationError::new(ErrorCode::TypeError, format!("Type error: {message}"));
            match line_hint(&message) {
                Some(line) => error.at_line(line),
                None => error,
            }
        }
        e @ ReflectError::Host(_) => ValidationError::new(
            ErrorCode::SchemaExtraction,
            format!("Schema extraction failed: {e}"),
        ),
    }
}

/// Recovers a line number from SDK error text of the form `'line': N`.
#[must_use]
pub fn line_hint(message: &str) -> Option<usize> {
    LINE_HINT
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|line| line.as_str().parse().ok())
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
