//! Contract structure checks.

use genvm_artefacts::ContractHeader;
use genvm_lint_common::{LintWarning, WarningCode};

/// Checks the leading dependency header.
#[must_use]
pub fn check_structure(source: &str) -> Vec<LintWarning> {
    let header = ContractHeader::parse(source);
    if !header.is_structured() {
        return vec![LintWarning::new(
            WarningCode::MissingHeader,
            "Missing contract dependency header (# { \"Seq\": [...] })",
            1,
        )];
    }
    if !header.mentions_core_runner() {
        return vec![LintWarning::new(
            WarningCode::MissingGenlayerDependency,
            "Missing py-genlayer dependency in header",
            1,
        )];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::complete("# { \"Seq\": [{ \"Depends\": \"py-genlayer:abc\" }] }\nx = 1\n", vec![])]
    #[case::missing("from genlayer import *\n", vec!["W010"])]
    #[case::not_a_header("# just a comment\n", vec!["W010"])]
    #[case::no_core("# { \"Seq\": [{ \"Depends\": \"py-lib-protobuf:abc\" }] }\n", vec!["W011"])]
    fn reports_header_problems(#[case] source: &str, #[case] expected: Vec<&str>) {
        let warnings = check_structure(source);

        let found: Vec<&str> = warnings.iter().map(|w| w.code.as_str()).collect();
        assert_eq!(found, expected);
        assert!(warnings.iter().all(|w| w.line == Some(1)));
    }
}
