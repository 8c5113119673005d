//! SDK-backed validation.
//!
//! # Modules
//!
//! - [`host`] - Host bindings seen by the SDK while reflecting
//! - [`sandbox`] - Import environment and contract class discovery
//! - [`reflect`] - Schema reflection over a contract class
//! - [`validator`] - Stage orchestration and error coding

pub mod host;
pub mod reflect;
pub mod sandbox;
pub mod validator;

pub use host::{HostCapabilities, ReflectionHost};
pub use reflect::{SchemaReflector, SdkReflector};
pub use sandbox::{LoadedContract, SandboxEnvironment, find_contract_class};
pub use validator::Validator;
