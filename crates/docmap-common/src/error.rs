//! Error types for docmap

use docmap_validation::ValidationErrors;
use thiserror::Error;

/// Result type alias for docmap operations
pub type Result<T> = std::result::Result<T, DocMapError>;

/// Unified error type for all docmap operations
#[derive(Error, Debug, Clone)]
pub enum DocMapError {
    /// One or more field or record validators rejected the document
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// The operation needs an identity the document does not have yet
    #[error("Document is not persisted: {0}")]
    NotPersisted(String),

    /// Missing registration or an invalid schema definition
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure reported by the collection collaborator, passed through untouched
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl DocMapError {
    /// Returns true if the caller can fix its input and try again
    pub fn is_validation(&self) -> bool {
        matches!(self, DocMapError::Validation(_))
    }

    /// Returns true if this error indicates a setup bug rather than bad input
    pub fn is_configuration(&self) -> bool {
        matches!(self, DocMapError::Configuration(_))
    }

    /// The validation errors carried by this error, if any
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            DocMapError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for DocMapError {
    fn from(err: mongodb::error::Error) -> Self {
        DocMapError::Persistence(err.to_string())
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for DocMapError {
    fn from(err: bson::ser::Error) -> Self {
        DocMapError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for DocMapError {
    fn from(err: bson::de::Error) -> Self {
        DocMapError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}
