//! Forbidden imports and non-deterministic calls.
//!
//! Contracts run under consensus, so anything that reads ambient state (the
//! clock, the filesystem, the network, randomness) makes validators disagree.

use genvm_lint_common::source::LogicalLine;
use genvm_lint_common::{ContractModule, LintWarning, WarningCode};
use regex::Regex;
use std::sync::LazyLock;

/// Top-level modules a contract may not import.
pub const FORBIDDEN_MODULES: &[&str] = &[
    "random",
    "os",
    "sys",
    "subprocess",
    "threading",
    "multiprocessing",
    "asyncio",
    "socket",
    "http",
    "requests",
    "pickle",
    "shelve",
    "sqlite3",
    "tempfile",
    "shutil",
    "glob",
    "pathlib",
    "io",
    "builtins",
];

/// Full module paths allowed even though their top-level package is not.
pub const ALLOWED_MODULES: &[&str] = &["urllib.parse"];

/// Calls whose results differ between validators.
pub const FORBIDDEN_CALLS: &[&str] = &[
    "time.time",
    "time.localtime",
    "time.gmtime",
    "uuid.uuid1",
    "uuid.uuid4",
];

#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_]\w*(?:\s*\.\s*[A-Za-z_]\w*)*\s*\(").expect("valid call pattern")
});

/// Runs the safety checks over a parsed module and its logical lines.
#[must_use]
pub fn check_safety(module: &ContractModule, lines: &[LogicalLine]) -> Vec<LintWarning> {
    let mut warnings = Vec::new();
    for import in module.imports() {
        if ALLOWED_MODULES.contains(&import.module()) {
            continue;
        }
        if !FORBIDDEN_MODULES.contains(&import.top_level()) {
            continue;
        }
        let msg = if import.is_from() {
            format!("Forbidden import from '{}'", import.module())
        } else {
            format!("Forbidden import '{}'", import.module())
        };
        warnings.push(LintWarning::new(
            WarningCode::ForbiddenImport,
            msg,
            import.line(),
        ));
    }
    for line in lines {
        check_calls(line, &mut warnings);
    }
    warnings
}

fn check_calls(line: &LogicalLine, warnings: &mut Vec<LintWarning>) {
    let text = line.text();
    if text.starts_with("def ") || text.starts_with("async def ") || text.starts_with("class ") {
        return;
    }
    for found in CALL.find_iter(text) {
        let preceded_by_dot = text
            .get(..found.start())
            .and_then(|before| before.trim_end().chars().last())
            == Some('.');
        if preceded_by_dot {
            continue;
        }
        let name: String = found
            .as_str()
            .trim_end_matches('(')
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect();
        let at = line.line_at(found.start());
        if FORBIDDEN_CALLS.contains(&name.as_str()) {
            warnings.push(LintWarning::new(
                WarningCode::NonDeterministicCall,
                format!("Non-deterministic call '{name}()'"),
                at,
            ));
        } else if name == "float" {
            warnings.push(LintWarning::new(
                WarningCode::FloatUsage,
                "Use of 'float' type (non-deterministic); use Decimal instead",
                at,
            ));
        }
    }
}
