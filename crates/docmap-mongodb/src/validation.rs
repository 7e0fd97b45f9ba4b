//! Input validation for MongoDB names and filters
//!
//! Collection and field names are checked when a schema or registration is
//! built, so a bad name is reported as a configuration error before anything
//! reaches the driver. Query filters are screened for operators that execute
//! server-side JavaScript.

use bson::Bson;
use docmap_common::{DocMapError, Result};

/// Maximum allowed length for collection names (MongoDB limit is 255, we're more conservative)
const MAX_COLLECTION_NAME_LENGTH: usize = 120;

/// Maximum allowed length for field names
const MAX_FIELD_NAME_LENGTH: usize = 1024;

/// Validated collection name
///
/// # Guarantees
/// - Not empty
/// - Maximum 120 characters
/// - No null bytes
/// - No "system." prefix (system collections)
/// - No $ characters (special operators)
/// - Warns on suspicious patterns (.., //)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollectionName {
    name: String,
}

impl ValidatedCollectionName {
    /// Creates a new validated collection name
    ///
    /// # Errors
    /// Returns a configuration error if:
    /// - Name is empty
    /// - Name exceeds MAX_COLLECTION_NAME_LENGTH
    /// - Name contains null bytes
    /// - Name starts with "system."
    /// - Name contains $ characters
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(DocMapError::Configuration(
                "Collection name cannot be empty".to_string()
            ));
        }

        if name.len() > MAX_COLLECTION_NAME_LENGTH {
            return Err(DocMapError::Configuration(
                format!(
                    "Collection name exceeds maximum length of {} characters: '{}'",
                    MAX_COLLECTION_NAME_LENGTH,
                    name
                )
            ));
        }

        if name.contains('\0') {
            return Err(DocMapError::Configuration(
                "Collection name cannot contain null bytes".to_string()
            ));
        }

        // Reserved for system collections
        if name.starts_with("system.") {
            return Err(DocMapError::Configuration(
                format!("Collection name cannot start with 'system.' (reserved): '{}'", name)
            ));
        }

        if name.contains('$') {
            return Err(DocMapError::Configuration(
                format!("Collection name cannot contain '$' character: '{}'", name)
            ));
        }

        // Warn on suspicious patterns (but allow them)
        if name.contains("..") || name.contains("//") {
            tracing::warn!("Collection name contains suspicious pattern: '{}'", name);
        }

        Ok(ValidatedCollectionName {
            name: name.to_string(),
        })
    }

    /// Returns the validated collection name as a string slice
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Consumes the ValidatedCollectionName and returns the inner String
    pub fn into_string(self) -> String {
        self.name
    }
}

impl AsRef<str> for ValidatedCollectionName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for ValidatedCollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Checks a document field name
///
/// # Errors
/// Returns a configuration error if:
/// - Name is empty
/// - Name exceeds MAX_FIELD_NAME_LENGTH
/// - Name contains null bytes
/// - Name starts with $ (reserved for operators)
pub fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DocMapError::Configuration(
            "Field name cannot be empty".to_string()
        ));
    }

    if name.len() > MAX_FIELD_NAME_LENGTH {
        return Err(DocMapError::Configuration(
            format!(
                "Field name exceeds maximum length of {} characters",
                MAX_FIELD_NAME_LENGTH
            )
        ));
    }

    if name.contains('\0') {
        return Err(DocMapError::Configuration(
            "Field name cannot contain null bytes".to_string()
        ));
    }

    if name.starts_with('$') {
        return Err(DocMapError::Configuration(
            format!(
                "Field name cannot start with '$' (reserved for operators): '{}'",
                name
            )
        ));
    }

    Ok(())
}

/// Dangerous MongoDB operators that should be blocked
const DANGEROUS_OPERATORS: &[&str] = &[
    "$where",       // JavaScript execution
    "$function",    // JavaScript execution
    "$accumulator", // Custom JavaScript in aggregation
];

/// Validates a MongoDB query filter for dangerous operators
///
/// # Errors
/// Returns a query error if dangerous operators are detected at any depth
pub fn validate_query(query: &Bson) -> Result<()> {
    match query {
        Bson::Document(doc) => {
            for (key, value) in doc.iter() {
                if DANGEROUS_OPERATORS.contains(&key.as_str()) {
                    return Err(DocMapError::Query(
                        format!(
                            "Dangerous operator '{}' is not allowed for security reasons",
                            key
                        )
                    ));
                }
                validate_query(value)?;
            }
            Ok(())
        }
        Bson::Array(arr) => {
            for item in arr {
                validate_query(item)?;
            }
            Ok(())
        }
        _ => Ok(()), // Primitive types are safe
    }
}
