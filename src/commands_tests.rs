//! Tests for command execution.

use super::*;
use crate::cli::{Cli, LegacyCli};
use camino::Utf8PathBuf;
use clap::Parser;
use genvm_artefacts::download::{DownloadError, ProgressFn};
use genvm_artefacts::test_support::BundleBuilder;
use rstest::{fixture, rstest};
use serde_json::Value;
use std::path::PathBuf;

const VERSION: &str = "v0.2.12";
const CONTRACT: &str = concat!(
    "# { \"Seq\": [{ \"Depends\": \"py-genlayer:abc123\" }] }\n",
    "from genlayer import *\n",
    "\n",
    "class Store(gl.Contract):\n",
    "    owner: Address\n",
    "\n",
    "    def __init__(self, owner: Address):\n",
    "        self.owner = owner\n",
    "\n",
    "    @gl.public.view\n",
    "    def get_owner(self) -> Address:\n",
    "        return self.owner\n",
);

/// Refuses every request, so only cached bundles are usable.
struct Offline;

impl ReleaseClient for Offline {
    fn final_url(&self, url: &str) -> Result<String, DownloadError> {
        Err(DownloadError::NotFound {
            url: url.to_owned(),
        })
    }

    fn fetch(
        &self,
        url: &str,
        _dest: &mut dyn Write,
        _progress: &mut ProgressFn<'_>,
    ) -> Result<u64, DownloadError> {
        Err(DownloadError::NotFound {
            url: url.to_owned(),
        })
    }
}

/// Has no platform cache directory; tests always configure one.
struct NoDirs;

impl BaseDirs for NoDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        None
    }
}

struct Project {
    temp: tempfile::TempDir,
    config: LinterConfig,
}

impl Project {
    fn path(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.temp.path().join(name)).expect("utf-8 path")
    }

    fn contract(&self, source: &str) -> Utf8PathBuf {
        let path = self.path("contract.py");
        std::fs::write(&path, source).expect("write contract");
        path
    }

    fn session(&self) -> Session<'static> {
        Session::new(self.config.clone(), &Offline, &NoDirs)
    }
}

#[fixture]
fn project() -> Project {
    let temp = tempfile::tempdir().expect("temp dir");
    let cache = Utf8PathBuf::from_path_buf(temp.path().join("cache")).expect("utf-8 path");
    let version = VersionTag::new(VERSION).expect("valid version");
    BundleBuilder::new()
        .core_runner("abc123", "std001")
        .component(
            "py-lib-genlayer-std",
            "std001",
            &[("src/genlayer/__init__.py", "")],
        )
        .write_to(CacheLayout::new(cache.as_std_path()).bundle_path(&version))
        .expect("write bundle");
    let config = LinterConfig {
        cache_dir: Some(cache),
        genvm_version: Some(VERSION.to_owned()),
        ..LinterConfig::default()
    };
    Project { temp, config }
}

struct Captured {
    outcome: Outcome,
    stdout: String,
    stderr: String,
}

fn run_args(project: &Project, args: &[&str]) -> Captured {
    let cli = Cli::try_parse_from(std::iter::once("genvm-lint").chain(args.iter().copied()))
        .expect("parse arguments");
    let (mut stdout, mut stderr) = (Vec::new(), Vec::new());
    let outcome =
        run(&cli.command, &project.session(), &mut stdout, &mut stderr).expect("command runs");
    Captured {
        outcome,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

fn parse_json(text: &str) -> Value {
    serde_json::from_str(text.trim()).expect("stdout is JSON")
}

#[rstest]
#[case(Outcome::Passed, 0)]
#[case(Outcome::Failed, 1)]
#[case(Outcome::DownloadFailed, 3)]
fn outcomes_map_to_exit_codes(#[case] outcome: Outcome, #[case] code: i32) {
    assert_eq!(outcome.exit_code(), code);
}

#[rstest]
fn check_reports_lint_and_validation(project: Project) {
    let contract = project.contract(CONTRACT);

    let captured = run_args(&project, &["check", contract.as_str(), "--json"]);

    assert_eq!(captured.outcome, Outcome::Passed);
    let report = parse_json(&captured.stdout);
    assert_eq!(report["ok"], true);
    assert_eq!(report["lint"]["passed"], 3);
    assert_eq!(report["validate"]["contract"], "Store");
    assert!(captured.stderr.is_empty());
}

#[rstest]
fn check_fails_when_lint_fails(project: Project) {
    let contract = project.contract(&CONTRACT.replace(
        "from genlayer import *\n",
        "from genlayer import *\nimport random\n",
    ));

    let captured = run_args(&project, &["check", contract.as_str(), "--json"]);

    assert_eq!(captured.outcome, Outcome::Failed);
    let report = parse_json(&captured.stdout);
    assert_eq!(report["ok"], false);
    assert_eq!(report["lint"]["warnings"][0]["code"], "W001");
}

#[rstest]
fn lint_prints_human_summary(project: Project) {
    let contract = project.contract(CONTRACT);

    let captured = run_args(&project, &["lint", contract.as_str()]);

    assert_eq!(captured.outcome, Outcome::Passed);
    assert_eq!(captured.stdout, "✓ Lint passed (3 checks)\n");
}

#[rstest]
fn configured_exclusions_apply_to_lint(mut project: Project) {
    project.config.lint.exclude_rules = vec!["W010".to_owned()];
    let contract = project.contract("class Plain:\n    pass\n");

    let captured = run_args(&project, &["lint", contract.as_str(), "--json"]);

    assert_eq!(captured.outcome, Outcome::Passed);
    assert_eq!(parse_json(&captured.stdout)["ok"], true);
}

#[rstest]
fn validate_reports_missing_class(project: Project) {
    let header = CONTRACT.lines().next().expect("header line");
    let contract = project.contract(&format!("{header}\nfrom genlayer import *\n\nx = 1\n"));

    let captured = run_args(&project, &["validate", contract.as_str()]);

    assert_eq!(captured.outcome, Outcome::Failed);
    assert_eq!(
        captured.stdout,
        "✗ Validation failed\n  No contract class found\n"
    );
}

#[rstest]
fn schema_json_wraps_the_schema(project: Project) {
    let contract = project.contract(CONTRACT);

    let captured = run_args(&project, &["schema", contract.as_str(), "--json"]);

    assert_eq!(captured.outcome, Outcome::Passed);
    let report = parse_json(&captured.stdout);
    assert_eq!(report["ok"], true);
    assert_eq!(report["schema"]["ctor"]["params"][0][0], "owner");
    assert_eq!(report["schema"]["methods"]["get_owner"]["readonly"], true);
}

#[rstest]
fn schema_json_lists_errors_on_failure(project: Project) {
    let contract = project.path("absent.py");

    let captured = run_args(&project, &["schema", contract.as_str(), "--json"]);

    assert_eq!(captured.outcome, Outcome::Failed);
    let report = parse_json(&captured.stdout);
    assert_eq!(report["ok"], false);
    assert_eq!(report["errors"][0]["code"], "E100");
}

#[rstest]
fn schema_output_file_is_indented_json(project: Project) {
    let contract = project.contract(CONTRACT);
    let output = project.path("abi.json");

    let captured = run_args(
        &project,
        &["schema", contract.as_str(), "-o", output.as_str()],
    );

    assert_eq!(captured.outcome, Outcome::Passed);
    assert_eq!(captured.stdout, format!("Schema written to {output}\n"));
    let written = std::fs::read_to_string(&output).expect("schema file");
    assert!(written.contains('\n'));
    let schema: Value = serde_json::from_str(&written).expect("schema JSON");
    assert!(schema["methods"]["get_owner"].is_object());
}

#[rstest]
fn schema_human_listing(project: Project) {
    let contract = project.contract(CONTRACT);

    let captured = run_args(&project, &["schema", contract.as_str()]);

    assert!(captured.stdout.starts_with("Contract: Store\n\nConstructor (1 params):\n"));
    assert!(captured.stdout.contains("  - get_owner() [view]"));
}

#[rstest]
fn invalid_configured_version_aborts(mut project: Project) {
    project.config.genvm_version = Some("../v1".to_owned());
    let contract = project.contract(CONTRACT);
    let cli = Cli::try_parse_from(["genvm-lint", "validate", contract.as_str()]).expect("parse");

    let err = run(&cli.command, &project.session(), &mut Vec::new(), &mut Vec::new())
        .expect_err("invalid version");

    assert!(matches!(err, CliError::Version(_)));
}

#[rstest]
fn download_list_shows_cached_versions(project: Project) {
    let captured = run_args(&project, &["download", "--list"]);

    assert_eq!(captured.outcome, Outcome::Passed);
    assert_eq!(captured.stdout, "Cached versions:\n  v0.2.12\n");
}

#[rstest]
fn download_list_with_empty_cache(mut project: Project) {
    project.config.cache_dir = Some(project.path("empty-cache"));

    let captured = run_args(&project, &["download", "--list"]);

    assert_eq!(captured.stdout, "No cached versions\n");
}

#[rstest]
fn download_reuses_a_cached_bundle(project: Project) {
    let captured = run_args(&project, &["download", "--version", VERSION]);

    assert_eq!(captured.outcome, Outcome::Passed);
    let mut lines = captured.stdout.lines();
    assert_eq!(lines.next(), Some("Downloading GenVM v0.2.12..."));
    assert!(lines.next().is_some_and(|line| line.starts_with("✓ Downloaded to ")));
}

#[rstest]
fn download_failure_exits_with_three(project: Project) {
    let captured = run_args(&project, &["download", "--version", "v9.9.9"]);

    assert_eq!(captured.outcome, Outcome::DownloadFailed);
    assert!(captured.stderr.starts_with("✗ Download failed: "));
}

#[rstest]
fn latest_lookup_failure_exits_with_three(project: Project) {
    let captured = run_args(&project, &["download"]);

    assert_eq!(captured.outcome, Outcome::DownloadFailed);
    assert_eq!(captured.stdout, "Fetching latest version...\n");
    assert!(captured.stderr.contains("Download failed"));
}

fn run_legacy_args(project: &Project, args: &[&str]) -> (Outcome, String) {
    let cli = LegacyCli::try_parse_from(std::iter::once("genvm-lint").chain(args.iter().copied()))
        .expect("parse legacy arguments");
    let mut stdout = Vec::new();
    let outcome = run_legacy(&cli, &project.session(), &mut stdout).expect("legacy run");
    (outcome, String::from_utf8(stdout).expect("utf-8 stdout"))
}

#[rstest]
fn legacy_missing_file_as_json(project: Project) {
    let missing = project.path("gone.py");

    let (outcome, stdout) = run_legacy_args(&project, &[missing.as_str(), "--format", "json"]);

    assert_eq!(outcome, Outcome::Failed);
    let payload = parse_json(&stdout);
    assert_eq!(payload["results"][0]["rule_id"], "E001");
    assert_eq!(
        payload["results"][0]["message"],
        format!("File not found: {missing}")
    );
    assert_eq!(payload["results"][0]["line"], 1);
}

#[rstest]
fn legacy_missing_file_as_text(project: Project) {
    let missing = project.path("gone.py");

    let (outcome, stdout) = run_legacy_args(&project, &[missing.as_str()]);

    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(stdout, format!("Error: File not found: {missing}\n"));
}

#[rstest]
fn legacy_severity_filter_keeps_only_errors(project: Project) {
    let contract = project.contract("import os\n");

    let (outcome, stdout) =
        run_legacy_args(&project, &[contract.as_str(), "--format", "json", "--severity", "error"]);

    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(parse_json(&stdout)["summary"]["total"], 0);
}

#[rstest]
fn legacy_exclusions_drop_codes(project: Project) {
    let contract = project.contract("import os\n");

    let (_, stdout) = run_legacy_args(
        &project,
        &[contract.as_str(), "--format", "json", "--exclude-rule", "W010"],
    );

    let payload = parse_json(&stdout);
    let codes: Vec<&str> = payload["results"]
        .as_array()
        .expect("results array")
        .iter()
        .filter_map(|result| result["rule_id"].as_str())
        .collect();
    assert_eq!(codes, ["W001"]);
}
