//! Lint and validation result payloads.
//!
//! The two result types are deliberately independent: linting never depends
//! on validation and vice versa. Their JSON forms are consumed by the editor
//! extension, so field presence follows fixed rules: optional fields are
//! omitted rather than emitted as `null`, and empty lists are dropped.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::codes::{ErrorCode, WarningCode};

/// A single lint finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LintWarning {
    /// Stable code such as `W001`.
    pub code: String,
    /// Human-readable description.
    pub msg: String,
    /// One-based line number; absent for file-level findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl LintWarning {
    /// Builds a warning for the given code.
    #[must_use]
    pub fn new(code: WarningCode, msg: impl Into<String>, line: usize) -> Self {
        Self {
            code: code.as_str().to_owned(),
            msg: msg.into(),
            line: Some(line),
        }
    }

    /// Builds a warning that applies to the whole file.
    #[must_use]
    pub fn unlocated(code: WarningCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_owned(),
            msg: msg.into(),
            line: None,
        }
    }

    /// Returns true for error-severity codes (those starting with `E`).
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.code.starts_with('E')
    }
}

/// Outcome of running the lint checks over one contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LintResult {
    ok: bool,
    checks_passed: usize,
    warnings: Vec<LintWarning>,
}

impl LintResult {
    /// Builds a result; `ok` holds exactly when no warnings were produced.
    #[must_use]
    pub fn new(checks_passed: usize, warnings: Vec<LintWarning>) -> Self {
        Self {
            ok: warnings.is_empty(),
            checks_passed,
            warnings,
        }
    }

    /// Whether the contract passed every check.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.ok
    }

    /// Number of check groups that reported nothing.
    #[must_use]
    pub const fn checks_passed(&self) -> usize {
        self.checks_passed
    }

    /// Findings in the order the checks produced them.
    #[must_use]
    pub fn warnings(&self) -> &[LintWarning] {
        &self.warnings
    }

    /// Drops warnings for which `keep` returns false.
    ///
    /// The `ok` flag is left untouched: it reflects the checks that ran, not
    /// the view a caller chose to display.
    pub fn retain_warnings(&mut self, keep: impl FnMut(&LintWarning) -> bool) {
        self.warnings.retain(keep);
    }

    /// Serialises to `{"ok", "passed", "warnings"?}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("ok".to_owned(), Value::Bool(self.ok));
        out.insert("passed".to_owned(), json!(self.checks_passed));
        if !self.warnings.is_empty() {
            out.insert("warnings".to_owned(), json!(self.warnings));
        }
        Value::Object(out)
    }
}

/// A single validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Stable code such as `E105`.
    pub code: String,
    /// Human-readable description.
    pub msg: String,
    /// One-based line number, when one could be recovered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ValidationError {
    /// Builds an error without location.
    #[must_use]
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_owned(),
            msg: msg.into(),
            line: None,
        }
    }

    /// Attaches a line number.
    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Outcome of SDK-backed validation of one contract.
///
/// A successful result always carries a schema and no errors; a failed one
/// carries errors and no schema.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationResult {
    ok: bool,
    contract_name: Option<String>,
    schema: Option<Value>,
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// A successful extraction.
    #[must_use]
    pub fn success(contract_name: impl Into<String>, schema: Value) -> Self {
        Self {
            ok: true,
            contract_name: Some(contract_name.into()),
            schema: Some(schema),
            errors: Vec::new(),
        }
    }

    /// A failed validation carrying a single error.
    #[must_use]
    pub fn failure(error: ValidationError) -> Self {
        Self {
            ok: false,
            contract_name: None,
            schema: None,
            errors: vec![error],
        }
    }

    /// Whether extraction fully succeeded.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.ok
    }

    /// Name of the discovered contract class.
    #[must_use]
    pub fn contract_name(&self) -> Option<&str> {
        self.contract_name.as_deref()
    }

    /// The schema exactly as the SDK produced it.
    #[must_use]
    pub const fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    /// Errors in the order they were raised.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Method counts derived from the schema, if there is one.
    #[must_use]
    pub fn summary(&self) -> Option<SchemaSummary> {
        self.schema.as_ref().map(SchemaSummary::from_schema)
    }

    /// Serialises to `{"ok", "contract"?, "methods"?, "view_methods"?,
    /// "write_methods"?, "ctor_params"?, "errors"?}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("ok".to_owned(), Value::Bool(self.ok));
        if let Some(name) = &self.contract_name {
            out.insert("contract".to_owned(), json!(name));
        }
        if let Some(summary) = self.summary() {
            out.insert("methods".to_owned(), json!(summary.methods));
            out.insert("view_methods".to_owned(), json!(summary.view_methods));
            out.insert("write_methods".to_owned(), json!(summary.write_methods));
            out.insert("ctor_params".to_owned(), json!(summary.ctor_params));
        }
        if !self.errors.is_empty() {
            out.insert("errors".to_owned(), json!(self.errors));
        }
        Value::Object(out)
    }
}

/// Counts extracted from an opaque schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchemaSummary {
    /// Number of public methods.
    pub methods: usize,
    /// Methods flagged `readonly`.
    pub view_methods: usize,
    /// Methods not flagged `readonly`.
    pub write_methods: usize,
    /// Constructor parameter count.
    pub ctor_params: usize,
}

impl SchemaSummary {
    /// Reads `methods.*.readonly` and `ctor.params`; missing keys count as zero.
    #[must_use]
    pub fn from_schema(schema: &Value) -> Self {
        let (methods, view_methods) = schema
            .get("methods")
            .and_then(Value::as_object)
            .map_or((0, 0), |methods| {
                let views = methods
                    .values()
                    .filter(|method| {
                        method
                            .get("readonly")
                            .and_then(Value::as_bool)
                            .unwrap_or(false)
                    })
                    .count();
                (methods.len(), views)
            });
        let ctor_params = schema
            .get("ctor")
            .and_then(|ctor| ctor.get("params"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Self {
            methods,
            view_methods,
            write_methods: methods - view_methods,
            ctor_params,
        }
    }
}
