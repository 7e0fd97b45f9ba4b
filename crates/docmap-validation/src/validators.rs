//! Composable field validators
//!
//! A [`Validator`] is a named rule from an input value to an output value. It
//! either passes the value through (possibly replaced, e.g. defaulted) or
//! rejects it with a message. Validators for one field are grouped in a
//! [`ValidatorChain`] and run in declaration order.
//!
//! Inputs are `Option<Value>`: `None` is an absent field, `Some(Value::Null)`
//! an explicit empty value. Only absence triggers `required` and `default_to`.
//! Pattern validators let absent values through, so a pattern alone does not
//! make a field required.
//!
//! # Example
//!
//! ```
//! use docmap_validation::{Validator, ValidatorChain, Value};
//!
//! let chain = ValidatorChain::new()
//!     .with(Validator::required("title is required"))
//!     .with(Validator::min_length(3, "title is too short"));
//!
//! let err = chain.run_field("posts", "title", None).unwrap_err();
//! assert_eq!(err.message, "title is required");
//!
//! let ok = chain.run_field("posts", "title", Some(Value::from("Hello")));
//! assert_eq!(ok.unwrap(), Some(Value::from("Hello")));
//! ```

use crate::errors::{ErrorType, ValidationError};
use crate::types::Value;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Validator
// ============================================================================

/// Outcome of running a single validator
pub type ValidatorOutcome = Result<Option<Value>, Rejection>;

/// Why a validator refused a value
///
/// Field and schema context are attached later by [`ValidatorChain::run_field`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub message: String,
    pub error_type: ErrorType,
}

impl Rejection {
    /// Rejection for a value that breaks the rule
    pub fn value(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::ValueError,
        }
    }

    /// Rejection for a value the rule cannot be applied to
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::TypeError,
        }
    }

    /// Rejection for an absent value
    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: ErrorType::Missing,
        }
    }
}

type ValidateFn = dyn Fn(Option<Value>) -> ValidatorOutcome + Send + Sync;

/// A single, stateless validation rule with a label for diagnostics
#[derive(Clone)]
pub struct Validator {
    label: String,
    validate_fn: Arc<ValidateFn>,
}

impl Validator {
    /// Create a validator from a function
    pub fn new<F>(label: impl Into<String>, validate_fn: F) -> Self
    where
        F: Fn(Option<Value>) -> ValidatorOutcome + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            validate_fn: Arc::new(validate_fn),
        }
    }

    /// Diagnostic label (e.g. `"min_length(3)"`)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run this validator against a value
    pub fn validate(&self, value: Option<Value>) -> ValidatorOutcome {
        (self.validate_fn)(value)
    }

    /// Enforce that a value is present
    ///
    /// An explicit `Value::Null` counts as present.
    pub fn required(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new("required", move |value| match value {
            None => Err(Rejection::missing(message.clone())),
            present => Ok(present),
        })
    }

    /// Substitute `default` when the value is absent
    pub fn default_to(default: impl Into<Value>) -> Self {
        let default = default.into();
        Self::new("default", move |value| {
            Ok(value.or_else(|| Some(default.clone())))
        })
    }

    /// Enforce that the value is at least `min` long
    pub fn min_length(min: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        let label = format!("min_length({})", min);
        Self::new(label.clone(), move |value| {
            match measure(&label, value.as_ref())? {
                Some(len) if len < min => Err(Rejection::value(message.clone())),
                _ => Ok(value),
            }
        })
    }

    /// Enforce that the value is at most `max` long
    pub fn max_length(max: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        let label = format!("max_length({})", max);
        Self::new(label.clone(), move |value| {
            match measure(&label, value.as_ref())? {
                Some(len) if len > max => Err(Rejection::value(message.clone())),
                _ => Ok(value),
            }
        })
    }

    /// Pattern validator with the historical polarity: fails when `pattern` matches
    ///
    /// Identical to [`Validator::reject_match`]. Use
    /// [`Validator::require_match`] to enforce a format.
    pub fn matches(pattern: Regex, message: impl Into<String>) -> Self {
        Self::reject_match(pattern, message)
    }

    /// Fail when the string value matches `pattern`
    pub fn reject_match(pattern: Regex, message: impl Into<String>) -> Self {
        let message = message.into();
        let label = format!("reject_match({})", pattern.as_str());
        Self::new(label.clone(), move |value| {
            if let Some(text) = pattern_input(&label, value.as_ref())? {
                if pattern.is_match(text) {
                    return Err(Rejection::value(message.clone()));
                }
            }
            Ok(value)
        })
    }

    /// Fail when the string value does not match `pattern`
    pub fn require_match(pattern: Regex, message: impl Into<String>) -> Self {
        let message = message.into();
        let label = format!("require_match({})", pattern.as_str());
        Self::new(label.clone(), move |value| {
            if let Some(text) = pattern_input(&label, value.as_ref())? {
                if !pattern.is_match(text) {
                    return Err(Rejection::value(message.clone()));
                }
            }
            Ok(value)
        })
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("label", &self.label).finish()
    }
}

/// Length of a value for the length validators
///
/// Absent and null values cannot be measured. Scalars without a length are
/// not comparable and yield `None`, which lets them through.
fn measure(label: &str, value: Option<&Value>) -> Result<Option<usize>, Rejection> {
    match value {
        None => Err(Rejection::type_mismatch(format!(
            "{}: cannot read the length of an absent value",
            label
        ))),
        Some(Value::Null) => Err(Rejection::type_mismatch(format!(
            "{}: cannot read the length of null",
            label
        ))),
        Some(v) => Ok(v.length()),
    }
}

/// Text a pattern validator tests, `None` when the value is absent
fn pattern_input<'a>(
    label: &str,
    value: Option<&'a Value>,
) -> Result<Option<&'a str>, Rejection> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Rejection::type_mismatch(format!(
            "{}: expected string, got {}",
            label,
            other.type_name()
        ))),
    }
}

// ============================================================================
// Validator Chain
// ============================================================================

/// Ordered validators for one field
///
/// The output of each validator is the input of the next; the first rejection
/// stops the chain.
#[derive(Debug, Clone, Default)]
pub struct ValidatorChain {
    validators: Vec<Validator>,
}

impl ValidatorChain {
    /// Create an empty chain (passes every value through)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator
    pub fn with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Append a validator in place
    pub fn push(&mut self, validator: Validator) {
        self.validators.push(validator);
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Labels of the validators, in run order
    pub fn labels(&self) -> Vec<&str> {
        self.validators.iter().map(Validator::label).collect()
    }

    /// Run the chain, stopping at the first rejection
    pub fn run(&self, value: Option<Value>) -> ValidatorOutcome {
        self.validators
            .iter()
            .try_fold(value, |current, validator| validator.validate(current))
    }

    /// Run the chain for a named field, attaching location and field to a failure
    pub fn run_field(
        &self,
        location: &str,
        field: &str,
        value: Option<Value>,
    ) -> Result<Option<Value>, ValidationError> {
        self.run(value).map_err(|rejection| {
            ValidationError::new(
                location.to_string(),
                field.to_string(),
                rejection.message,
                rejection.error_type,
            )
        })
    }
}

impl FromIterator<Validator> for ValidatorChain {
    fn from_iter<I: IntoIterator<Item = Validator>>(iter: I) -> Self {
        Self {
            validators: iter.into_iter().collect(),
        }
    }
}
