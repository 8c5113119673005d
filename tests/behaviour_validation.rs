//! Behaviour-driven tests for contract validation.
//!
//! Scenarios cache a fixture release bundle, write a contract, and run the
//! full validator against it without network access.

use camino::Utf8PathBuf;
use genvm_artefacts::download::{DownloadError, ProgressFn, ReleaseClient, ReleaseUrls};
use genvm_artefacts::extraction::XzBundleReader;
use genvm_artefacts::store::LexicographicLatest;
use genvm_artefacts::test_support::BundleBuilder;
use genvm_artefacts::{ArchiveStore, CacheLayout, ReleaseFetcher, VersionTag};
use genvm_lint::Validator;
use genvm_lint_common::ValidationResult;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::io::Write;

const HEADER: &str = "# { \"Seq\": [{ \"Depends\": \"py-genlayer:abc123\" }] }\n";

const GREETER: &str = "\
from genlayer import *

class Greeter(gl.Contract):
    greeting: str

    def __init__(self):
        self.greeting = \"hello\"

    @gl.public.view
    def greet(self) -> str:
        return self.greeting
";

const HELPERS_ONLY: &str = "\
from genlayer import *

def helper() -> int:
    return 1
";

const UNCLOSED_CALL: &str = "\
from genlayer import *

class Broken(gl.Contract):
    @gl.public.view
    def ok(self) -> int:
        return (1 +
";

/// Every request fails; only cached bundles are usable.
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

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

struct ValidationWorld {
    temp: tempfile::TempDir,
    version: Option<VersionTag>,
    contract: Option<Utf8PathBuf>,
    result: Option<ValidationResult>,
}

impl ValidationWorld {
    fn layout(&self) -> CacheLayout {
        CacheLayout::new(self.temp.path().join("cache"))
    }

    fn result(&self) -> &ValidationResult {
        self.result.as_ref().expect("validation ran")
    }
}

#[fixture]
fn world() -> ValidationWorld {
    ValidationWorld {
        temp: tempfile::tempdir().expect("temp dir"),
        version: None,
        contract: None,
        result: None,
    }
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("GenVM \"{version}\" is cached with core runner \"{core}\"")]
fn given_cached_release(world: &mut ValidationWorld, version: String, core: String) {
    let version = VersionTag::new(version).expect("valid version");
    BundleBuilder::new()
        .core_runner(&core, "std001")
        .component(
            "py-lib-genlayer-std",
            "std001",
            &[("src/genlayer/__init__.py", "")],
        )
        .write_to(world.layout().bundle_path(&version))
        .expect("write bundle");
    world.version = Some(version);
}

#[given("the validator is pinned to GenVM \"{version}\"")]
fn given_pinned_version(world: &mut ValidationWorld, version: String) {
    world.version = Some(VersionTag::new(version).expect("valid version"));
}

#[given("the \"{name}\" contract")]
fn given_contract(world: &mut ValidationWorld, name: String) {
    let body = match name.as_str() {
        "greeter" => GREETER,
        "helpers only" => HELPERS_ONLY,
        "unclosed call" => UNCLOSED_CALL,
        other => panic!("unknown contract fixture {other}"),
    };
    let path = world.temp.path().join("contract.py");
    std::fs::write(&path, format!("{HEADER}{body}")).expect("write contract");
    world.contract = Some(Utf8PathBuf::from_path_buf(path).expect("utf-8 path"));
}

#[when("the contract is validated")]
fn when_validated(world: &mut ValidationWorld) {
    let contract = world.contract.clone().expect("contract described");
    let fetcher = ReleaseFetcher::new(&Offline, world.layout(), ReleaseUrls::default());
    let store = ArchiveStore::new(world.layout(), &XzBundleReader, &LexicographicLatest);
    let result = Validator::new(&fetcher, &store)
        .with_version(world.version.clone())
        .validate(&contract, None);
    world.result = Some(result);
}

#[then("validation passes for contract \"{name}\" with {count} method")]
fn then_passes(world: &mut ValidationWorld, name: String, count: usize) {
    let result = world.result();
    assert!(result.ok(), "errors: {:?}", result.errors());
    assert_eq!(result.contract_name(), Some(name.as_str()));
    assert_eq!(result.summary().map(|summary| summary.methods), Some(count));
}

#[then("validation fails with \"{code}\"")]
fn then_fails(world: &mut ValidationWorld, code: String) {
    let result = world.result();
    assert!(!result.ok());
    assert!(result.schema().is_none());
    let codes: Vec<&str> = result.errors().iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, [code.as_str()]);
}

#[then("the error has no line")]
fn then_no_line(world: &mut ValidationWorld) {
    assert_eq!(world.result().errors()[0].line, None);
}

#[then("the error is on line {line}")]
fn then_on_line(world: &mut ValidationWorld, line: usize) {
    assert_eq!(world.result().errors()[0].line, Some(line));
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/contract_validation.feature",
    name = "A contract with one public method validates"
)]
fn scenario_valid_contract(world: ValidationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/contract_validation.feature",
    name = "A module without a contract class is rejected"
)]
fn scenario_no_contract_class(world: ValidationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/contract_validation.feature",
    name = "A syntax error is reported at its line"
)]
fn scenario_syntax_error(world: ValidationWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/contract_validation.feature",
    name = "An uncached release cannot load the SDK"
)]
fn scenario_uncached_release(world: ValidationWorld) {
    let _ = world;
}
