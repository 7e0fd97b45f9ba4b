//! docmap Validation
//!
//! Field-level validation for the docmap document mapper.
//!
//! This crate provides the runtime [`Value`] model shared by records and
//! schemas, single-purpose [`Validator`] rules and the ordered
//! [`ValidatorChain`] a schema attaches to each field.
//!
//! # Features
//!
//! - **Default**: Core validation
//! - **serde**: Conversions between [`Value`] and `serde_json::Value`
//!
//! # Example
//!
//! ```rust
//! use docmap_validation::{Validator, ValidatorChain, Value};
//!
//! let chain = ValidatorChain::new()
//!     .with(Validator::default_to("untitled"))
//!     .with(Validator::max_length(40, "title is too long"));
//!
//! assert_eq!(chain.run(None), Ok(Some(Value::from("untitled"))));
//! ```

// Public modules
pub mod errors;
pub mod types;
pub mod validators;

// Re-export commonly used types
pub use errors::{ErrorType, ValidationError, ValidationErrors, ValidationResult};
pub use types::Value;
pub use validators::{Rejection, Validator, ValidatorChain, ValidatorOutcome};

// Re-exported so callers can build pattern validators without a direct dependency
pub use regex::Regex;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
