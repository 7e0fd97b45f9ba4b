//! Validation error types
//!
//! This module defines error types for validation failures.

use std::fmt;

// ============================================================================
// Validation Result
// ============================================================================

/// Validation result type
pub type ValidationResult<T> = Result<T, ValidationErrors>;

// ============================================================================
// Validation Errors Collection
// ============================================================================

/// Collection of validation errors
///
/// A schema reports every failing field at once; each field contributes at
/// most one error because its validator chain stops at the first failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    /// List of individual validation errors
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
        }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add a validation error to the collection
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add multiple validation errors
    pub fn extend(&mut self, errors: impl IntoIterator<Item = ValidationError>) {
        self.errors.extend(errors);
    }

    /// Merge another ValidationErrors into this one
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// Convert to Result - Ok if no errors, Err if there are errors
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Get errors as a slice
    pub fn as_slice(&self) -> &[ValidationError] {
        &self.errors
    }

    /// First error reported
    pub fn first(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    /// The error reported for a given field, if any
    pub fn for_field(&self, field: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// Messages of all errors, in report order
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "0 validation error(s)"),
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "{} validation error(s)", many.len())?;
                for error in many {
                    write!(f, "\n  - {}", error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Single Validation Error
// ============================================================================

/// A single validation error
///
/// This struct represents a single field validation error with information
/// about where the error occurred and what went wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Schema the error was raised in (empty for a bare validator run)
    pub location: String,

    /// Field name or path (e.g., "title", "author.name")
    pub field: String,

    /// Human-readable error message
    pub message: String,

    /// Error type classification
    pub error_type: ErrorType,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(location: String, field: String, message: String, error_type: ErrorType) -> Self {
        Self {
            location,
            field,
            message,
            error_type,
        }
    }

    /// Create a type error
    pub fn type_error(location: String, field: String, message: String) -> Self {
        Self::new(location, field, message, ErrorType::TypeError)
    }

    /// Create a value error
    pub fn value_error(location: String, field: String, message: String) -> Self {
        Self::new(location, field, message, ErrorType::ValueError)
    }

    /// Create a missing field error
    pub fn missing_error(location: String, field: String, message: String) -> Self {
        Self::new(location, field, message, ErrorType::Missing)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} [{}]",
            self.location, self.field, self.message, self.error_type
        )
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Error Type Classification
// ============================================================================

/// Classification of validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    /// Type mismatch error, or a validator applied to a value it cannot inspect
    TypeError,

    /// Value constraint violation (e.g., string too long, pattern rejected)
    ValueError,

    /// Required field missing
    Missing,

    /// Extra field not allowed
    ExtraForbidden,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeError => write!(f, "type_error"),
            Self::ValueError => write!(f, "value_error"),
            Self::Missing => write!(f, "missing"),
            Self::ExtraForbidden => write!(f, "extra_forbidden"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(field: &str, message: &str) -> ValidationError {
        ValidationError::value_error("posts".to_string(), field.to_string(), message.to_string())
    }

    #[test]
    fn test_validation_errors_empty() {
        let errors = ValidationErrors::new();
        assert!(errors.is_empty());
        assert_eq!(errors.len(), 0);
        assert!(errors.into_result().is_ok());
    }

    #[test]
    fn test_validation_errors_add() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::type_error(
            "posts".to_string(),
            "views".to_string(),
            "Expected integer".to_string(),
        ));
        assert!(!errors.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().map(|e| e.error_type), Some(ErrorType::TypeError));
    }

    #[test]
    fn test_for_field_and_messages() {
        let mut errors = ValidationErrors::new();
        errors.add(error("title", "too short"));
        errors.add(error("slug", "bad slug"));

        assert_eq!(errors.for_field("slug").map(|e| e.message.as_str()), Some("bad slug"));
        assert!(errors.for_field("body").is_none());
        assert_eq!(errors.messages(), vec!["too short", "bad slug"]);
    }

    #[test]
    fn test_display_single_and_many() {
        let single = ValidationErrors::from(error("title", "too short"));
        assert_eq!(single.to_string(), "posts (title): too short [value_error]");

        let mut many = single.clone();
        many.add(error("slug", "bad slug"));
        assert_eq!(
            many.to_string(),
            "2 validation error(s)\n  - posts (title): too short [value_error]\n  - posts (slug): bad slug [value_error]"
        );
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::TypeError.to_string(), "type_error");
        assert_eq!(ErrorType::ValueError.to_string(), "value_error");
        assert_eq!(ErrorType::Missing.to_string(), "missing");
        assert_eq!(ErrorType::ExtraForbidden.to_string(), "extra_forbidden");
    }
}
