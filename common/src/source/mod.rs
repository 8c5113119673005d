//! Contract source scanning.
//!
//! Contracts are Python modules. Validation never executes them; instead the
//! source is scanned into logical lines, checked for block structure, and
//! lowered into a [`ContractModule`] of imports and top-level class
//! declarations. Publicly exposed methods carry an explicit [`PublicMarker`]
//! derived from their decorators.

mod blocks;
mod declarations;
mod scanner;

pub use declarations::{
    ClassDecl, ContractModule, FieldDecl, ImportDecl, MethodDecl, ParamDecl, ParamKind,
    PublicMarker,
};
pub use scanner::{LogicalLine, logical_lines};

/// A located parse failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {line})")]
pub struct SyntaxError {
    message: String,
    line: usize,
}

impl SyntaxError {
    /// Builds an error at a one-based line.
    #[must_use]
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }

    /// Description without the location suffix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// One-based line of the failure.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }
}

/// Scans and structurally checks `source`, returning its logical lines.
///
/// # Errors
///
/// Returns the first [`SyntaxError`] found.
pub fn check_syntax(source: &str) -> Result<Vec<LogicalLine>, SyntaxError> {
    let lines = logical_lines(source)?;
    blocks::check_blocks(&lines)?;
    Ok(lines)
}

/// Parses `source` into its declarations.
///
/// # Errors
///
/// Returns the first [`SyntaxError`] found.
///
/// # Examples
///
/// ```
/// use genvm_lint_common::parse_module;
///
/// let module = parse_module("class Box(gl.Contract):\n    x: int\n").expect("valid source");
/// assert_eq!(module.classes()[0].name(), "Box");
/// ```
pub fn parse_module(source: &str) -> Result<ContractModule, SyntaxError> {
    let lines = check_syntax(source)?;
    Ok(declarations::lower(&lines))
}
