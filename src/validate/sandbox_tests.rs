//! Tests for the sandbox environment.

use super::*;
use crate::validate::host::ReflectionHost;
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

struct Sdk {
    _temp: TempDir,
    components: Vec<PathBuf>,
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write file");
}

#[fixture]
fn sdk() -> Sdk {
    let temp = tempfile::tempdir().expect("temp dir");
    let std_dir = temp.path().join("py-lib-genlayer-std/std001");
    write(&std_dir.join("src/genlayer/__init__.py"), "");
    let proto_dir = temp.path().join("py-lib-protobuf/pb001");
    write(&proto_dir.join("google/protobuf/__init__.py"), "");
    let emb_dir = temp.path().join("py-lib-genlayer-embeddings/emb001");
    write(&emb_dir.join("src/genlayer_embeddings.py"), "");
    Sdk {
        _temp: temp,
        components: vec![std_dir, proto_dir, emb_dir],
    }
}

fn load(environment: &SandboxEnvironment<'_>, source: &str) -> Result<LoadedContract, LoadError> {
    environment.load_source(Path::new("contract.py"), source.to_owned())
}

#[rstest]
fn search_path_applies_the_source_root_rule(sdk: Sdk) {
    let environment =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("prepare");

    let expected = vec![
        sdk.components[0].join("src"),
        sdk.components[1].clone(),
        sdk.components[2].join("src"),
    ];
    assert_eq!(environment.search_path(), expected.as_slice());
}

#[rstest]
fn missing_entry_package_is_reported(sdk: Sdk) {
    let without_std = &sdk.components[1..];

    let err = SandboxEnvironment::prepare(without_std, &ReflectionHost, &[])
        .err()
        .expect("prepare should fail");

    assert!(matches!(
        err,
        SandboxError::MissingEntryPackage { package: "genlayer", searched: 2 }
    ));
}

#[rstest]
fn preparing_twice_gives_the_same_environment(sdk: Sdk) {
    let first = SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("first");
    let second =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("second");

    assert_eq!(first.search_path(), second.search_path());
}

#[rstest]
#[case::sdk("genlayer")]
#[case::sdk_submodule("genlayer.py.types")]
#[case::protobuf("google.protobuf")]
#[case::module_file("genlayer_embeddings")]
#[case::stdlib("typing")]
#[case::numpy("numpy")]
fn resolves_known_modules(sdk: Sdk, #[case] module: &str) {
    let environment =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("prepare");

    assert!(environment.resolves(module));
}

#[rstest]
#[case::unknown("pandas")]
#[case::relative(".helpers")]
#[case::bare_relative(".")]
fn rejects_unknown_modules(sdk: Sdk, #[case] module: &str) {
    let environment =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("prepare");

    assert!(!environment.resolves(module));
}

#[rstest]
fn extra_modules_extend_resolution(sdk: Sdk) {
    let extra = vec!["pandas".to_owned()];
    let environment =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &extra).expect("prepare");

    assert!(environment.resolves("pandas.core"));
}

#[rstest]
fn syntax_errors_keep_their_line(sdk: Sdk) {
    let environment =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("prepare");

    let err = load(&environment, "x = 1\ny = (\n").err().expect("load should fail");

    let LoadError::Syntax(syntax) = err else {
        panic!("expected a syntax error, got {err:?}");
    };
    assert_eq!(syntax.line(), 2);
}

#[rstest]
fn first_unresolved_import_is_reported(sdk: Sdk) {
    let environment =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("prepare");
    let source = "from genlayer import *\nimport pandas\nimport polars\n";

    let err = load(&environment, source).err().expect("load should fail");

    assert_eq!(err.to_string(), "No module named 'pandas'");
    assert!(matches!(err, LoadError::Import { line: 2, .. }));
}

#[rstest]
fn unreadable_contract_is_a_read_error(sdk: Sdk) {
    let environment =
        SandboxEnvironment::prepare(&sdk.components, &ReflectionHost, &[]).expect("prepare");

    let err = environment
        .load_contract_module(Path::new("/nonexistent/contract.py"))
        .err()
        .expect("load should fail");

    assert!(matches!(err, LoadError::Read { .. }));
}

#[rstest]
#[case::public_method(
    "class Helper:\n    x: int\n\nclass Store:\n    @gl.public.view\n    def get(self) -> int:\n        return 1\n",
    Some("Store")
)]
#[case::inherits(
    "class Base(gl.Contract):\n    pass\n\nclass Store(Base):\n    pass\n",
    Some("Base")
)]
#[case::skips_contract_itself(
    "class Contract:\n    @gl.public.view\n    def get(self) -> int:\n        return 1\n",
    None
)]
#[case::none("class Plain:\n    def helper(self):\n        return 1\n", None)]
fn finds_the_contract_class(#[case] source: &str, #[case] expected: Option<&str>) {
    let module = parse_module(source).expect("valid source");

    assert_eq!(find_contract_class(&module).map(ClassDecl::name), expected);
}
