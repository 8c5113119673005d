//! Stable diagnostic codes shared by the CLI, JSON payloads, and the editor
//! adapter. The string forms are part of the external contract and must not
//! change.

use std::fmt;

/// Codes reported by the validation pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The contract file does not exist.
    ContractNotFound,
    /// Version resolution, download, extraction, or SDK resolution failed.
    SdkLoad,
    /// The contract does not parse.
    Syntax,
    /// A module imported by the contract could not be resolved.
    Import,
    /// The contract could not be loaded for another reason.
    ContractLoad,
    /// No class in the module qualifies as a contract.
    NoContractClass,
    /// The SDK rejected a type while reflecting over the contract.
    TypeError,
    /// Reflection failed for any other reason.
    SchemaExtraction,
}

impl ErrorCode {
    /// Returns the wire representation, for example `E105`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContractNotFound => "E100",
            Self::SdkLoad => "E101",
            Self::Syntax => "E102",
            Self::Import => "E103",
            Self::ContractLoad => "E104",
            Self::NoContractClass => "E105",
            Self::TypeError => "E106",
            Self::SchemaExtraction => "E107",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codes reported by the lint checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarningCode {
    /// The source does not parse.
    Syntax,
    /// The contract file does not exist.
    ContractNotFound,
    /// Import of a module that is non-deterministic in a contract.
    ForbiddenImport,
    /// Call to a non-deterministic function.
    NonDeterministicCall,
    /// Use of the `float` constructor.
    FloatUsage,
    /// The leading dependency header is missing or malformed.
    MissingHeader,
    /// The header does not declare the `py-genlayer` runner.
    MissingGenlayerDependency,
}

impl WarningCode {
    /// Returns the wire representation, for example `W001`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "E001",
            Self::ContractNotFound => "E100",
            Self::ForbiddenImport => "W001",
            Self::NonDeterministicCall => "W002",
            Self::FloatUsage => "W003",
            Self::MissingHeader => "W010",
            Self::MissingGenlayerDependency => "W011",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
