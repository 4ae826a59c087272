//! Store error types

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A bound was configured as zero
    #[error("Invalid capacity: {0} must be greater than zero")]
    InvalidCapacity(&'static str),

    /// Result could not be serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A writer panicked while holding the store lock
    #[error("Store lock poisoned")]
    LockPoisoned,
}
