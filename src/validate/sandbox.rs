//! Import environment for loading a contract against extracted SDK sources.
//!
//! The environment is a value: it holds the module search path, the modules
//! available without a search-path hit, and the host bindings handed to the
//! reflector. Each validation builds its own, so nothing carries over between
//! calls.

use genvm_lint_common::{ClassDecl, ContractModule, SyntaxError, parse_module};
use log::{debug, trace};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::host::HostCapabilities;

/// Package every SDK search path must provide.
pub const SDK_ENTRY_PACKAGE: &str = "genlayer";

/// Base class name that marks a contract.
pub const CONTRACT_BASE: &str = "Contract";

/// Modules resolvable without the SDK search path.
pub const BUILTIN_MODULES: &[&str] = &[
    "__future__",
    "abc",
    "array",
    "asyncio",
    "base64",
    "binascii",
    "bisect",
    "builtins",
    "calendar",
    "collections",
    "contextlib",
    "copy",
    "dataclasses",
    "datetime",
    "decimal",
    "enum",
    "fractions",
    "functools",
    "glob",
    "hashlib",
    "heapq",
    "hmac",
    "html",
    "http",
    "io",
    "itertools",
    "json",
    "math",
    "multiprocessing",
    "numbers",
    "operator",
    "os",
    "pathlib",
    "pickle",
    "random",
    "re",
    "shelve",
    "shutil",
    "socket",
    "sqlite3",
    "statistics",
    "string",
    "struct",
    "subprocess",
    "sys",
    "tempfile",
    "textwrap",
    "threading",
    "time",
    "types",
    "typing",
    "unicodedata",
    "urllib",
    "uuid",
    "warnings",
    "weakref",
];

/// Third-party modules the SDK environment always carries.
pub const DEFAULT_ALLOWED_MODULES: &[&str] = &["numpy"];

/// Failure to build the environment.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// No search-path entry provides the SDK entry package.
    #[error("SDK package '{package}' not found in {searched} search path entries")]
    MissingEntryPackage {
        /// Package that was looked for.
        package: &'static str,
        /// Number of entries searched.
        searched: usize,
    },
}

/// Failure to load a contract module.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The contract source does not parse.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// A module imported by the contract does not resolve.
    #[error("No module named '{module}'")]
    Import {
        /// Module name as written.
        module: String,
        /// Line of the import statement.
        line: usize,
    },
    /// The contract file could not be read.
    #[error("could not read {path}: {source}")]
    Read {
        /// Contract path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// A contract parsed inside a prepared environment.
#[derive(Clone, Debug)]
pub struct LoadedContract {
    path: PathBuf,
    source: String,
    module: ContractModule,
}

impl LoadedContract {
    /// Path the contract was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Contract source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed declarations.
    #[must_use]
    pub const fn module(&self) -> &ContractModule {
        &self.module
    }
}

/// Search path and host bindings for one validation.
pub struct SandboxEnvironment<'h> {
    search_path: Vec<PathBuf>,
    allowed_modules: Vec<String>,
    host: &'h dyn HostCapabilities,
}

impl<'h> SandboxEnvironment<'h> {
    /// Builds the environment from resolved SDK component directories.
    ///
    /// Each component contributes its `src` directory when it has one, else
    /// its root. Entries keep the resolver's order, so the foundational
    /// library is searched first. `extra_modules` extends the modules that
    /// resolve without a search-path hit.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxError::MissingEntryPackage`] when no entry provides
    /// the `genlayer` package.
    pub fn prepare(
        components: &[PathBuf],
        host: &'h dyn HostCapabilities,
        extra_modules: &[String],
    ) -> Result<Self, SandboxError> {
        let search_path: Vec<PathBuf> = components.iter().map(|dir| source_root(dir)).collect();
        debug!("sandbox search path: {search_path:?}");

        let allowed_modules = DEFAULT_ALLOWED_MODULES
            .iter()
            .map(|&name| name.to_owned())
            .chain(extra_modules.iter().cloned())
            .collect();
        let environment = Self {
            search_path,
            allowed_modules,
            host,
        };
        if environment.find_on_search_path(SDK_ENTRY_PACKAGE).is_none() {
            return Err(SandboxError::MissingEntryPackage {
                package: SDK_ENTRY_PACKAGE,
                searched: environment.search_path.len(),
            });
        }
        Ok(environment)
    }

    /// Directories searched for imports, in order.
    #[must_use]
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Host bindings installed for this environment.
    #[must_use]
    pub fn host(&self) -> &dyn HostCapabilities {
        self.host
    }

    /// Whether `module` resolves in this environment.
    ///
    /// Only the top-level package is looked up. Relative imports never
    /// resolve because the contract is loaded as a standalone module.
    #[must_use]
    pub fn resolves(&self, module: &str) -> bool {
        let top_level = module.split('.').next().unwrap_or(module);
        if top_level.is_empty() {
            return false;
        }
        BUILTIN_MODULES.contains(&top_level)
            || self.allowed_modules.iter().any(|name| name == top_level)
            || self.find_on_search_path(top_level).is_some()
    }

    /// Reads and loads the contract at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Read`] when the file cannot be read, otherwise
    /// see [`Self::load_source`].
    pub fn load_contract_module(&self, path: &Path) -> Result<LoadedContract, LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_source(path, source)
    }

    /// Loads already-read contract source.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Syntax`] with the offending line, or
    /// [`LoadError::Import`] for the first import that does not resolve.
    pub fn load_source(&self, path: &Path, source: String) -> Result<LoadedContract, LoadError> {
        let module = parse_module(&source)?;
        if let Some(missing) = module
            .imports()
            .iter()
            .find(|import| !self.resolves(import.module()))
        {
            return Err(LoadError::Import {
                module: missing.module().to_owned(),
                line: missing.line(),
            });
        }
        Ok(LoadedContract {
            path: path.to_path_buf(),
            source,
            module,
        })
    }

    fn find_on_search_path(&self, package: &str) -> Option<PathBuf> {
        self.search_path.iter().find_map(|dir| {
            let package_dir = dir.join(package);
            if package_dir.is_dir() {
                trace!("resolved {package} to {}", package_dir.display());
                return Some(package_dir);
            }
            let file = dir.join(format!("{package}.py"));
            file.is_file().then_some(file)
        })
    }
}

fn source_root(component: &Path) -> PathBuf {
    let src = component.join("src");
    if src.is_dir() {
        src
    } else {
        component.to_path_buf()
    }
}

/// Finds the class the SDK should reflect over.
///
/// Classes are checked in declaration order. A class qualifies when it has a
/// publicly exposed method or derives from `Contract`; a class itself named
/// `Contract` is skipped.
#[must_use]
pub fn find_contract_class(module: &ContractModule) -> Option<&ClassDecl> {
    module
        .classes()
        .iter()
        .filter(|class| class.name() != CONTRACT_BASE)
        .find(|class| class.has_public_methods() || module.inherits_from(class, CONTRACT_BASE))
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
