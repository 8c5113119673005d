//! `genvm-lint` command-line entrypoint.
//!
//! Results go to stdout; progress, logging, and fatal errors go to stderr.
//! Exit codes: 0 when every check passed, 1 when a check failed or the
//! command could not run, 3 when GenVM artefacts could not be downloaded.

use clap::Parser;
use env_logger::Env;
use genvm_artefacts::dirs::SystemBaseDirs;
use genvm_artefacts::download::HttpReleaseClient;
use genvm_lint::cli::{Cli, LegacyCli, is_legacy_invocation};
use genvm_lint::commands::{CliError, Outcome, Session, run, run_legacy};
use genvm_lint::config::LinterConfig;
use std::ffi::OsString;
use std::io::Write;

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let mut stdout = std::io::stdout().lock();
    let mut stderr = std::io::stderr();
    let run_result = if is_legacy_invocation(&args) {
        let cli = LegacyCli::parse_from(&args);
        init_logging(false);
        run_legacy_cli(&cli, &mut stdout)
    } else {
        let cli = Cli::parse_from(&args);
        init_logging(cli.verbose);
        run_cli(&cli, &mut stdout, &mut stderr)
    };
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug output.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn run_cli(
    cli: &Cli,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<Outcome, CliError> {
    let config = LinterConfig::load(cli.config.as_deref())?;
    let client = HttpReleaseClient::new(config.download_timeout());
    let session = Session::new(config, &client, &SystemBaseDirs);
    run(&cli.command, &session, stdout, stderr)
}

fn run_legacy_cli(cli: &LegacyCli, stdout: &mut dyn Write) -> Result<Outcome, CliError> {
    let config = LinterConfig::load(None)?;
    let client = HttpReleaseClient::new(config.download_timeout());
    let session = Session::new(config, &client, &SystemBaseDirs);
    run_legacy(cli, &session, stdout)
}

fn exit_code_for_run_result(result: Result<Outcome, CliError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            write_stderr_line(stderr, format_args!("Error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
