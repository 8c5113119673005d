//! Command execution.
//!
//! Commands write results to `stdout` and status or progress to `stderr`;
//! both are injected so the binary and the tests share one code path.

use camino::Utf8Path;
use genvm_artefacts::cache::CacheError;
use genvm_artefacts::dirs::BaseDirs;
use genvm_artefacts::download::{ReleaseClient, ReleaseUrls};
use genvm_artefacts::extraction::XzBundleReader;
use genvm_artefacts::release::FetchError;
use genvm_artefacts::store::LexicographicLatest;
use genvm_artefacts::version::VersionError;
use genvm_artefacts::{ArchiveStore, CacheLayout, ReleaseFetcher, VersionTag};
use genvm_lint_common::{LintResult, LintWarning, ValidationResult, WarningCode};
use serde_json::{Value, json};
use std::io::{self, Write};
use thiserror::Error;

use crate::cli::{
    Command, ContractArgs, DownloadArgs, LegacyCli, LegacyFormat, LegacySeverity, SchemaArgs,
};
use crate::config::{ConfigError, LinterConfig};
use crate::lint::Linter;
use crate::output::{
    format_human_lint, format_human_schema, format_human_validate, format_json,
    format_json_pretty, format_progress, format_vscode_json,
};
use crate::validate::Validator;

/// Errors that abort a command before it can report a result.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The cache root could not be determined.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A configured or requested version is not a valid tag.
    #[error("invalid GenVM version: {0}")]
    Version(#[from] VersionError),

    /// Writing output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    /// The schema file could not be written.
    #[error("failed to write schema to {path}: {source}")]
    WriteSchema {
        /// Requested output path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// JSON serialisation failed.
    #[error("failed to serialise JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a command ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every check passed.
    Passed,
    /// The contract failed a check.
    Failed,
    /// Artefacts could not be downloaded.
    DownloadFailed,
}

impl Outcome {
    /// Process exit code: 0, 1, or 3.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Passed => 0,
            Self::Failed => 1,
            Self::DownloadFailed => 3,
        }
    }

    const fn from_ok(ok: bool) -> Self {
        if ok { Self::Passed } else { Self::Failed }
    }
}

/// Collaborators shared by every command.
pub struct Session<'a> {
    config: LinterConfig,
    client: &'a dyn ReleaseClient,
    dirs: &'a dyn BaseDirs,
}

impl<'a> Session<'a> {
    /// A session downloading through `client` and placing the cache with
    /// `dirs` unless configuration overrides it.
    #[must_use]
    pub fn new(
        config: LinterConfig,
        client: &'a dyn ReleaseClient,
        dirs: &'a dyn BaseDirs,
    ) -> Self {
        Self {
            config,
            client,
            dirs,
        }
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &LinterConfig {
        &self.config
    }

    fn layout(&self) -> Result<CacheLayout, CliError> {
        let override_root = self.config.cache_dir.as_deref().map(Utf8Path::as_std_path);
        Ok(CacheLayout::discover(self.dirs, override_root)?)
    }

    fn fetcher(&self, layout: CacheLayout) -> ReleaseFetcher<'a> {
        ReleaseFetcher::new(
            self.client,
            layout,
            ReleaseUrls::new(self.config.release_url.as_str()),
        )
    }

    fn pinned_version(&self) -> Result<Option<VersionTag>, CliError> {
        Ok(self
            .config
            .genvm_version
            .as_deref()
            .map(VersionTag::new)
            .transpose()?)
    }

    fn lint(&self, contract: &Utf8Path) -> LintResult {
        Linter::new(self.config.lint.exclude_rules.clone()).lint_file(contract)
    }

    fn validate(
        &self,
        contract: &Utf8Path,
        show_progress: bool,
        stderr: &mut dyn Write,
    ) -> Result<ValidationResult, CliError> {
        let layout = self.layout()?;
        let fetcher = self.fetcher(layout.clone());
        let store = ArchiveStore::new(layout, &XzBundleReader, &LexicographicLatest);
        let validator = Validator::new(&fetcher, &store)
            .with_version(self.pinned_version()?)
            .with_extra_modules(self.config.lint.extra_allowed_modules.clone());

        if !show_progress {
            return Ok(validator.validate(contract, None));
        }
        let mut reporter = ProgressReporter::new("Downloading: ", stderr);
        let result = validator.validate(
            contract,
            Some(&mut |done, total| reporter.report(done, total)),
        );
        reporter.finish();
        Ok(result)
    }
}

/// Writes `\r`-terminated progress lines and a closing newline once any
/// progress was shown.
struct ProgressReporter<'w> {
    prefix: &'static str,
    out: &'w mut dyn Write,
    shown: bool,
}

impl<'w> ProgressReporter<'w> {
    fn new(prefix: &'static str, out: &'w mut dyn Write) -> Self {
        Self {
            prefix,
            out,
            shown: false,
        }
    }

    fn report(&mut self, downloaded: u64, total: u64) {
        if let Some(line) = format_progress(self.prefix, downloaded, total) {
            // Progress is cosmetic; a closed stderr must not fail the download.
            if write!(self.out, "{line}").and_then(|()| self.out.flush()).is_ok() {
                self.shown = true;
            }
        }
    }

    fn finish(self) {
        if !self.shown {
            return;
        }
        if writeln!(self.out).is_err() {
            // Best-effort; see `report`.
        }
    }
}

/// Runs a parsed subcommand.
///
/// # Errors
///
/// Returns [`CliError`] when the command cannot produce a result at all,
/// for example when output cannot be written.
pub fn run(
    command: &Command,
    session: &Session<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Outcome, CliError> {
    match command {
        Command::Check(args) => run_check(args, session, stdout, stderr),
        Command::Lint(args) => run_lint(args, session, stdout),
        Command::Validate(args) => run_validate(args, session, stdout, stderr),
        Command::Schema(args) => run_schema(args, session, stdout, stderr),
        Command::Download(args) => run_download(args, session, stdout, stderr),
    }
}

fn run_check(
    args: &ContractArgs,
    session: &Session<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Outcome, CliError> {
    let lint = session.lint(&args.contract);
    let validation = session.validate(&args.contract, !args.json, stderr)?;
    let ok = lint.ok() && validation.ok();
    if args.json {
        let report = json!({
            "ok": ok,
            "lint": lint.to_json(),
            "validate": validation.to_json(),
        });
        writeln!(stdout, "{}", format_json(&report))?;
    } else {
        writeln!(stdout, "{}", format_human_lint(&lint))?;
        writeln!(stdout, "{}", format_human_validate(&validation))?;
    }
    Ok(Outcome::from_ok(ok))
}

fn run_lint(
    args: &ContractArgs,
    session: &Session<'_>,
    stdout: &mut dyn Write,
) -> Result<Outcome, CliError> {
    let result = session.lint(&args.contract);
    if args.json {
        writeln!(stdout, "{}", format_json(&result.to_json()))?;
    } else {
        writeln!(stdout, "{}", format_human_lint(&result))?;
    }
    Ok(Outcome::from_ok(result.ok()))
}

fn run_validate(
    args: &ContractArgs,
    session: &Session<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Outcome, CliError> {
    let result = session.validate(&args.contract, !args.json, stderr)?;
    if args.json {
        writeln!(stdout, "{}", format_json(&result.to_json()))?;
    } else {
        writeln!(stdout, "{}", format_human_validate(&result))?;
    }
    Ok(Outcome::from_ok(result.ok()))
}

fn run_schema(
    args: &SchemaArgs,
    session: &Session<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Outcome, CliError> {
    let json_output = args.contract.json;
    let result = session.validate(&args.contract.contract, !json_output, stderr)?;
    let schema = match result.schema() {
        Some(schema) if result.ok() => schema,
        _ => {
            if json_output {
                let report = json!({"ok": false, "errors": result.errors()});
                writeln!(stdout, "{}", format_json(&report))?;
            } else {
                writeln!(stdout, "{}", format_human_validate(&result))?;
            }
            return Ok(Outcome::Failed);
        }
    };

    if let Some(path) = &args.output {
        std::fs::write(path, format_json_pretty(schema)?).map_err(|source| {
            CliError::WriteSchema {
                path: path.to_string(),
                source,
            }
        })?;
        writeln!(stdout, "Schema written to {path}")?;
    } else if json_output {
        let report: Value = json!({"ok": true, "schema": schema});
        writeln!(stdout, "{}", format_json(&report))?;
    } else {
        writeln!(stdout, "{}", format_human_schema(&result))?;
    }
    Ok(Outcome::Passed)
}

fn run_download(
    args: &DownloadArgs,
    session: &Session<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Outcome, CliError> {
    let fetcher = session.fetcher(session.layout()?);

    if args.list {
        let versions = fetcher.list_cached_versions()?;
        if versions.is_empty() {
            writeln!(stdout, "No cached versions")?;
        } else {
            writeln!(stdout, "Cached versions:")?;
            for version in versions {
                writeln!(stdout, "  {version}")?;
            }
        }
        return Ok(Outcome::Passed);
    }

    let version = match args.version.as_deref() {
        Some(requested) => VersionTag::new(requested)?,
        None => {
            writeln!(stdout, "Fetching latest version...")?;
            match fetcher.resolve_latest_version() {
                Ok(version) => {
                    writeln!(stdout, "Latest: {version}")?;
                    version
                }
                Err(e) => return report_download_failure(&e, stderr),
            }
        }
    };

    writeln!(stdout, "Downloading GenVM {version}...")?;
    let mut reporter = ProgressReporter::new("  ", stderr);
    let outcome = fetcher.ensure_bundle(
        Some(&version),
        Some(&mut |done, total| reporter.report(done, total)),
    );
    reporter.finish();
    match outcome {
        Ok(path) => {
            writeln!(stdout, "✓ Downloaded to {}", path.display())?;
            Ok(Outcome::Passed)
        }
        Err(e) => report_download_failure(&e, stderr),
    }
}

fn report_download_failure(
    error: &FetchError,
    stderr: &mut dyn Write,
) -> Result<Outcome, CliError> {
    writeln!(stderr, "✗ Download failed: {error}")?;
    Ok(Outcome::DownloadFailed)
}

/// Runs the legacy editor invocation, which only lints.
///
/// A missing contract is reported as an `E001` finding at line 1.
///
/// # Errors
///
/// Returns [`CliError::Io`] if output cannot be written.
pub fn run_legacy(
    cli: &LegacyCli,
    session: &Session<'_>,
    stdout: &mut dyn Write,
) -> Result<Outcome, CliError> {
    if !cli.contract.exists() {
        let message = format!("File not found: {}", cli.contract);
        match cli.format {
            LegacyFormat::Json => {
                let missing = LintResult::new(
                    0,
                    vec![LintWarning::new(WarningCode::Syntax, message, 1)],
                );
                writeln!(stdout, "{}", format_vscode_json(&missing, None))?;
            }
            LegacyFormat::Text => writeln!(stdout, "Error: {message}")?,
        }
        return Ok(Outcome::Failed);
    }

    let mut result = session.lint(&cli.contract);
    if cli.severity == Some(LegacySeverity::Error) {
        result.retain_warnings(LintWarning::is_error);
    }
    if !cli.exclude_rules.is_empty() {
        result.retain_warnings(|warning| !cli.exclude_rules.contains(&warning.code));
    }
    match cli.format {
        LegacyFormat::Json => writeln!(stdout, "{}", format_vscode_json(&result, None))?,
        LegacyFormat::Text => writeln!(stdout, "{}", format_human_lint(&result))?,
    }
    Ok(Outcome::from_ok(result.ok()))
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
