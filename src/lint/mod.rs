//! Fast source-only checks.
//!
//! Linting never touches the SDK or the network. Three check groups run in
//! order: safety, structure, and syntax. A group with no findings counts
//! towards `checks_passed`. Safety checks need a parsed module, so they
//! report nothing when the file does not parse; the syntax group reports the
//! failure instead.

pub mod safety;
pub mod structure;

use camino::Utf8Path;
use genvm_lint_common::{LintResult, LintWarning, WarningCode, check_syntax, parse_module};
use log::debug;

pub use safety::check_safety;
pub use structure::check_structure;

/// Lints contract source with optional rule exclusions.
#[derive(Clone, Debug, Default)]
pub struct Linter {
    excluded: Vec<String>,
}

impl Linter {
    /// A linter that drops findings whose code is listed in `excluded`.
    #[must_use]
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }

    /// Lints the file at `path`.
    ///
    /// A missing or unreadable file yields a failed result rather than an
    /// error.
    #[must_use]
    pub fn lint_file(&self, path: &Utf8Path) -> LintResult {
        match std::fs::read_to_string(path) {
            Ok(source) => self.lint_source(&source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LintResult::new(
                0,
                vec![LintWarning::unlocated(
                    WarningCode::ContractNotFound,
                    format!("Contract not found: {path}"),
                )],
            ),
            Err(e) => LintResult::new(
                0,
                vec![LintWarning::unlocated(
                    WarningCode::ContractNotFound,
                    format!("Could not read {path}: {e}"),
                )],
            ),
        }
    }

    /// Lints contract source text.
    #[must_use]
    pub fn lint_source(&self, source: &str) -> LintResult {
        let mut warnings = Vec::new();
        let mut passed = 0;

        let parsed = check_syntax(source).and_then(|lines| Ok((parse_module(source)?, lines)));
        let safety = match &parsed {
            Ok((module, lines)) => check_safety(module, lines),
            Err(_) => Vec::new(),
        };
        self.record(safety, &mut warnings, &mut passed);

        self.record(check_structure(source), &mut warnings, &mut passed);

        match parsed {
            Ok(_) => passed += 1,
            Err(e) => {
                debug!("syntax check failed: {e}");
                warnings.push(LintWarning::new(
                    WarningCode::Syntax,
                    format!("Syntax error: {}", e.message()),
                    e.line(),
                ));
            }
        }

        LintResult::new(passed, warnings)
    }

    fn record(&self, found: Vec<LintWarning>, warnings: &mut Vec<LintWarning>, passed: &mut usize) {
        let kept: Vec<LintWarning> = found
            .into_iter()
            .filter(|warning| !self.excluded.contains(&warning.code))
            .collect();
        if kept.is_empty() {
            *passed += 1;
        } else {
            warnings.extend(kept);
        }
    }
}

/// Lints `path` with no exclusions.
#[must_use]
pub fn lint_contract(path: &Utf8Path) -> LintResult {
    Linter::default().lint_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HEADER: &str = "# { \"Seq\": [{ \"Depends\": \"py-genlayer:abc123\" }] }\n";

    #[rstest]
    fn clean_contract_passes_every_group() {
        let source = format!(
            "{HEADER}from genlayer import *\n\nclass C(gl.Contract):\n    @gl.public.view\n    def get(self) -> int:\n        return 1\n"
        );

        let result = Linter::default().lint_source(&source);

        assert!(result.ok());
        assert_eq!(result.checks_passed(), 3);
        assert!(result.warnings().is_empty());
    }

    #[rstest]
    fn syntax_error_skips_safety_and_reports_line() {
        let source = format!("{HEADER}import os\nclass C:\n    def f(self)\n        pass\n");

        let result = Linter::default().lint_source(&source);

        assert!(!result.ok());
        assert_eq!(result.checks_passed(), 2);
        let warnings = result.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "E001");
        assert_eq!(warnings[0].line, Some(4));
        assert!(warnings[0].msg.starts_with("Syntax error: "));
    }

    #[rstest]
    fn findings_keep_group_order() {
        let source = "import random\nx = float(1)\n";

        let result = Linter::default().lint_source(source);

        let found: Vec<&str> = result.warnings().iter().map(|w| w.code.as_str()).collect();
        assert_eq!(found, vec!["W001", "W003", "W010"]);
        assert_eq!(result.checks_passed(), 1);
    }

    #[rstest]
    fn excluded_rules_do_not_fail_the_group() {
        let linter = Linter::new(vec!["W010".to_owned()]);

        let result = linter.lint_source("x = 1\n");

        assert!(result.ok());
        assert_eq!(result.checks_passed(), 3);
    }

    #[rstest]
    fn missing_file_is_reported_without_line() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = camino::Utf8PathBuf::from_path_buf(temp.path().join("absent.py"))
            .expect("utf-8 temp path");

        let result = lint_contract(&path);

        assert!(!result.ok());
        assert_eq!(result.checks_passed(), 0);
        assert_eq!(result.warnings()[0].code, "E100");
        assert_eq!(result.warnings()[0].line, None);
    }
}
