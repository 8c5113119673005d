//! Shared building blocks for `genvm-lint`: the stable diagnostic codes, the
//! lint and validation result payloads consumed by every presentation layer,
//! and a lightweight scanner that turns contract source into declarations.

pub mod codes;
pub mod result;
pub mod source;

pub use codes::{ErrorCode, WarningCode};
pub use result::{LintResult, LintWarning, SchemaSummary, ValidationError, ValidationResult};
pub use source::{
    ClassDecl, ContractModule, FieldDecl, ImportDecl, MethodDecl, ParamDecl, ParamKind,
    PublicMarker, SyntaxError, check_syntax, parse_module,
};
