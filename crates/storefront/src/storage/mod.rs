//! Durable client-side key-value storage.
//!
//! The storefront persists exactly two values between runs: the customer's
//! bearer token and a snapshot of the guest cart. Both go through the
//! [`KeyValueStore`] port so the cart manager can be exercised against an
//! in-memory store in tests and a directory of files in the CLI.
//!
//! Writes are synchronous. Callers hold no locks across `.await` while
//! touching the store.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Key for the customer's bearer token.
    pub const AUTH_TOKEN: &str = "token";

    /// Key for the serialized guest cart.
    pub const CART: &str = "cart";
}

/// Errors that can occur when reading or writing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be encoded.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Key contains characters that cannot be stored.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Validate that a key is safe to use as a file name.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}
