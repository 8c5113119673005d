//! Human, JSON, and editor renderings of lint and validation results.
//!
//! Every formatter returns a string; callers decide where it goes.

use genvm_lint_common::{LintResult, ValidationResult};
use serde::Serialize;
use serde_json::{Value, json};

const MIB: u64 = 1024 * 1024;

/// Renders a lint result for a terminal.
#[must_use]
pub fn format_human_lint(result: &LintResult) -> String {
    if result.ok() {
        return format!("✓ Lint passed ({} checks)", result.checks_passed());
    }
    let mut lines = vec!["✗ Lint failed".to_owned()];
    lines.extend(
        result
            .warnings()
            .iter()
            .map(|warning| located_line(warning.line, &warning.msg)),
    );
    lines.join("\n")
}

/// Renders a validation result for a terminal.
#[must_use]
pub fn format_human_validate(result: &ValidationResult) -> String {
    if !result.ok() {
        let mut lines = vec!["✗ Validation failed".to_owned()];
        lines.extend(
            result
                .errors()
                .iter()
                .map(|error| located_line(error.line, &error.msg)),
        );
        return lines.join("\n");
    }
    let mut lines = vec!["✓ Validation passed".to_owned()];
    if let Some(name) = result.contract_name() {
        lines.push(format!("  Contract: {name}"));
    }
    if let Some(summary) = result.summary() {
        lines.push(format!(
            "  Methods: {} ({} view, {} write)",
            summary.methods, summary.view_methods, summary.write_methods
        ));
    }
    lines.join("\n")
}

/// Renders the constructor and method listing of an extracted schema.
///
/// Failed results fall back to [`format_human_validate`].
#[must_use]
pub fn format_human_schema(result: &ValidationResult) -> String {
    let (true, Some(schema)) = (result.ok(), result.schema()) else {
        return format_human_validate(result);
    };
    let mut lines = vec![
        format!("Contract: {}", result.contract_name().unwrap_or_default()),
        String::new(),
    ];

    let ctor_params = schema
        .get("ctor")
        .and_then(|ctor| ctor.get("params"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    lines.push(format!("Constructor ({} params):", ctor_params.len()));
    for param in ctor_params {
        let (name, ty) = param_parts(param);
        lines.push(format!("  - {name}: {}", format_type(ty)));
    }
    lines.push(String::new());

    let methods = schema.get("methods").and_then(Value::as_object);
    lines.push(format!("Methods ({}):", methods.map_or(0, serde_json::Map::len)));
    for (name, info) in methods.into_iter().flatten() {
        let tag = if info.get("readonly").and_then(Value::as_bool) == Some(true) {
            "[view]"
        } else {
            "[write]"
        };
        let params: Vec<&str> = info
            .get("params")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|param| param_parts(param).0)
            .collect();
        lines.push(format!("  - {name}({}) {tag}", params.join(", ")));
    }
    lines.join("\n")
}

fn located_line(line: Option<usize>, msg: &str) -> String {
    match line {
        Some(line) if line > 0 => format!("  line {line}: {msg}"),
        _ => format!("  {msg}"),
    }
}

/// Splits a schema parameter given as `[name, type]` or `{name, type}`.
fn param_parts(param: &Value) -> (&str, &Value) {
    match param {
        Value::Array(pair) => (
            pair.first().and_then(Value::as_str).unwrap_or("?"),
            pair.get(1).unwrap_or(&Value::Null),
        ),
        other => (
            other.get("name").and_then(Value::as_str).unwrap_or("?"),
            other.get("type").unwrap_or(&Value::Null),
        ),
    }
}

/// Renders a schema type: references by name, unions joined with ` | `.
#[must_use]
pub fn format_type(ty: &Value) -> String {
    match ty {
        Value::String(name) => name.clone(),
        Value::Object(fields) => {
            if let Some(Value::String(name)) = fields.get("$ref") {
                name.clone()
            } else if let Some(Value::Array(alternatives)) = fields.get("$or") {
                alternatives
                    .iter()
                    .map(format_type)
                    .collect::<Vec<_>>()
                    .join(" | ")
            } else if let Some(Value::String(name)) = fields.get("type") {
                name.clone()
            } else {
                ty.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// Compact JSON.
#[must_use]
pub fn format_json(value: &Value) -> String {
    value.to_string()
}

/// Indented JSON.
///
/// # Errors
///
/// Returns the serialiser error; this only happens for non-string map keys,
/// which [`Value`] cannot hold.
pub fn format_json_pretty(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// One diagnostic in the editor payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EditorDiagnostic {
    /// Diagnostic code.
    pub rule_id: String,
    /// Human-readable message.
    pub message: String,
    /// `error` or `warning`.
    pub severity: &'static str,
    /// One-based line; file-level findings are pinned to line 1.
    pub line: usize,
    /// Always zero.
    pub column: usize,
}

/// Renders results in the editor extension's format.
///
/// Lint findings with an `E` code are errors, the rest warnings. Validation
/// errors are appended only when validation failed.
#[must_use]
pub fn format_vscode_json(lint: &LintResult, validation: Option<&ValidationResult>) -> String {
    let mut results: Vec<EditorDiagnostic> = lint
        .warnings()
        .iter()
        .map(|warning| EditorDiagnostic {
            rule_id: warning.code.clone(),
            message: warning.msg.clone(),
            severity: if warning.is_error() { "error" } else { "warning" },
            line: warning.line.unwrap_or(1),
            column: 0,
        })
        .collect();
    if let Some(validation) = validation.filter(|validation| !validation.ok()) {
        results.extend(validation.errors().iter().map(|error| EditorDiagnostic {
            rule_id: error.code.clone(),
            message: error.msg.clone(),
            severity: "error",
            line: error.line.unwrap_or(1),
            column: 0,
        }));
    }
    let errors = results
        .iter()
        .filter(|result| result.severity == "error")
        .count();
    let report = json!({
        "results": results,
        "summary": {
            "total": results.len(),
            "by_severity": {
                "error": errors,
                "warning": results.len() - errors,
                "info": 0,
            },
        },
    });
    report.to_string()
}

/// Formats a progress line such as `\rDownloading: 1.5/10.0 MB (15%)`.
///
/// Returns `None` when the total is unknown.
#[must_use]
pub fn format_progress(prefix: &str, downloaded: u64, total: u64) -> Option<String> {
    if total == 0 {
        return None;
    }
    let percent = (u128::from(downloaded) * 100 / u128::from(total)).min(100);
    Some(format!(
        "\r{prefix}{}/{} MB ({percent}%)",
        megabytes(downloaded),
        megabytes(total)
    ))
}

/// Bytes as mebibytes with one decimal, rounded half up.
fn megabytes(bytes: u64) -> String {
    let tenths = (u128::from(bytes) * 10 + u128::from(MIB / 2)) / u128::from(MIB);
    format!("{}.{}", tenths / 10, tenths % 10)
}
