//! Low-level host bindings seen by the SDK during reflection.
//!
//! The SDK expects a live execution host behind its storage and messaging
//! primitives. Reflection never executes a contract, so the validator hands
//! the SDK a [`ReflectionHost`] whose calls all succeed with empty results.

use thiserror::Error;

/// Failure reported by a host binding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    /// The binding is not available in this environment.
    #[error("host call {call} is unavailable: {reason}")]
    Unavailable {
        /// Name of the binding that failed.
        call: String,
        /// Description of the failure.
        reason: String,
    },
}

/// Storage and messaging primitives the SDK can reach while reflecting.
#[cfg_attr(test, mockall::automock)]
pub trait HostCapabilities {
    /// Reads `len` bytes of the storage slot `slot` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the slot cannot be read.
    fn storage_read(&self, slot: &str, offset: u32, len: u32) -> Result<Vec<u8>, HostError>;

    /// Writes `data` to the storage slot `slot` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the slot cannot be written.
    fn storage_write(&self, slot: &str, offset: u32, data: &[u8]) -> Result<(), HostError>;

    /// Balance of `address`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the balance cannot be queried.
    fn get_balance(&self, address: &str) -> Result<u128, HostError>;

    /// Balance of the contract itself.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the balance cannot be queried.
    fn get_self_balance(&self) -> Result<u128, HostError>;

    /// Generic host call; returns the host's status word.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the call fails.
    fn gl_call(&self, request: &[u8]) -> Result<u64, HostError>;
}

/// Host bindings for reflection only.
///
/// Storage reads come back empty, balances are zero, and generic calls are
/// no-ops. Nothing here models contract execution.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReflectionHost;

impl HostCapabilities for ReflectionHost {
    fn storage_read(&self, _slot: &str, _offset: u32, _len: u32) -> Result<Vec<u8>, HostError> {
        Ok(Vec::new())
    }

    fn storage_write(&self, _slot: &str, _offset: u32, _data: &[u8]) -> Result<(), HostError> {
        Ok(())
    }

    fn get_balance(&self, _address: &str) -> Result<u128, HostError> {
        Ok(0)
    }

    fn get_self_balance(&self) -> Result<u128, HostError> {
        Ok(0)
    }

    fn gl_call(&self, _request: &[u8]) -> Result<u64, HostError> {
        Ok(0)
    }
}
