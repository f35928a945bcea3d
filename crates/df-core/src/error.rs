//! Error types for DataFoundation
//!
//! Every routine outcome (missing entity, expired attribute, bad payload) has
//! its own variant so callers can report it without treating it as a fault.

use thiserror::Error;

/// The main error type for DataFoundation operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lookup Errors ==========
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    // ========== Conflict Errors ==========
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    // ========== Validation Errors ==========
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Decode error: {0}")]
    Decode(String),

    // ========== Storage Errors ==========
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ========== IO Errors ==========
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for DataFoundation operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the error reports something that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::EntityNotFound(_) | Error::AttributeNotFound(_) | Error::RelationshipNotFound(_)
        )
    }

    /// Returns true if the caller can correct the request and retry
    pub fn is_recoverable(&self) -> bool {
        self.is_not_found()
            || matches!(
                self,
                Error::AlreadyExists(_) | Error::ValidationError(_) | Error::Decode(_)
            )
    }

    /// Returns true if this error indicates data corruption
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::DataCorruption(_))
    }

    /// Returns true for failures of the system itself rather than of the request
    pub fn is_fault(&self) -> bool {
        !self.is_recoverable()
    }
}
