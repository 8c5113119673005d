//! Linter and SDK-backed validator for GenLayer intelligent contracts.
//!
//! Linting is fast and source-only: forbidden imports, non-deterministic
//! calls, float usage, and the dependency header. Validation resolves the
//! GenVM SDK the contract pins, loads the contract against it, and extracts
//! the ABI schema the way the runtime would.
//!
//! # Modules
//!
//! - [`cli`] - Argument grammar, including the legacy editor form
//! - [`commands`] - Command execution and exit codes
//! - [`config`] - `genvm-lint.toml` and environment overrides
//! - [`lint`] - Source-only safety and structure checks
//! - [`output`] - Human, JSON, and editor renderings
//! - [`validate`] - SDK loading, contract discovery, and schema reflection

pub mod cli;
pub mod commands;
pub mod config;
pub mod lint;
pub mod output;
pub mod validate;

pub use commands::{CliError, Outcome, Session};
pub use config::LinterConfig;
pub use lint::{Linter, lint_contract};
pub use validate::Validator;
