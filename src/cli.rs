//! CLI argument definitions.
//!
//! Two grammars are accepted. The subcommand form (`genvm-lint check
//! contract.py --json`) is the primary interface. The legacy form
//! (`genvm-lint contract.py --format json`) is what older editor extensions
//! spawn, and is recognised by a first argument that is neither a subcommand
//! nor a flag.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;

/// Names that select the subcommand grammar.
pub const SUBCOMMANDS: &[&str] = &["check", "lint", "validate", "schema", "download"];

/// Lint and validate GenLayer intelligent contracts.
#[derive(Parser, Debug, Clone)]
#[command(name = "genvm-lint")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Lint and validate a contract:\n",
    "    $ genvm-lint check contract.py\n\n",
    "  Machine-readable output:\n",
    "    $ genvm-lint check contract.py --json\n\n",
    "  Write the contract ABI to a file:\n",
    "    $ genvm-lint schema contract.py -o abi.json\n\n",
    "  Pre-fetch a GenVM release for offline use:\n",
    "    $ genvm-lint download --version v0.2.12",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file [default: ./genvm-lint.toml when present].
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Log resolution and cache decisions to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run both lint and validate (default workflow).
    Check(ContractArgs),

    /// Run fast source-only safety checks.
    Lint(ContractArgs),

    /// Run SDK-backed semantic validation.
    Validate(ContractArgs),

    /// Extract the ABI schema from a contract.
    Schema(SchemaArgs),

    /// Pre-download GenVM artefacts for offline use.
    Download(DownloadArgs),
}

/// Arguments shared by commands that take one contract.
#[derive(Args, Debug, Clone)]
pub struct ContractArgs {
    /// Path to the contract file.
    pub contract: Utf8PathBuf,

    /// Output compact JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `schema`.
#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Contract and output format.
    #[command(flatten)]
    pub contract: ContractArgs,

    /// Write the schema to this file as indented JSON.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,
}

/// Arguments for `download`.
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// GenVM version, e.g. v0.2.12 [default: latest].
    #[arg(short = 'v', long = "version", value_name = "VERSION")]
    pub version: Option<String>,

    /// List cached versions instead of downloading.
    #[arg(long)]
    pub list: bool,
}

/// Legacy editor invocation.
#[derive(Parser, Debug, Clone)]
#[command(name = "genvm-lint", about = "GenLayer contract linter (legacy mode)")]
pub struct LegacyCli {
    /// Path to the contract file.
    pub contract: Utf8PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = LegacyFormat::Text)]
    pub format: LegacyFormat,

    /// Only report findings of this severity.
    #[arg(long, value_enum)]
    pub severity: Option<LegacySeverity>,

    /// Drop findings with this code (repeatable).
    #[arg(long = "exclude-rule", value_name = "CODE")]
    pub exclude_rules: Vec<String>,
}

/// Legacy output formats.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyFormat {
    /// Editor diagnostics JSON.
    Json,
    /// Human-readable text.
    Text,
}

/// Legacy severity filter.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacySeverity {
    /// Only `E` codes.
    Error,
    /// Everything.
    Warning,
    /// Everything.
    Info,
}

/// Whether `args` (including the program name) use the legacy grammar.
#[must_use]
pub fn is_legacy_invocation<S: AsRef<OsStr>>(args: &[S]) -> bool {
    let Some(first) = args.get(1) else {
        return false;
    };
    let first = first.as_ref().to_string_lossy();
    let first: &str = &first;
    !(SUBCOMMANDS.contains(&first) || first.starts_with('-'))
}
