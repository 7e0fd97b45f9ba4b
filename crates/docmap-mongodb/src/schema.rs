//! Declarative document schemas
//!
//! A [`Schema`] is an ordered list of [`Field`]s, each with a [`FieldType`]
//! and a [`ValidatorChain`], plus record-level [`RecordRule`]s. It owns no
//! mutable state: validation and projection are pure functions of a
//! [`Record`].
//!
//! # Example
//!
//! ```
//! use docmap_mongodb::{Field, FieldType, Record, Schema};
//! use docmap_validation::{Validator, Value};
//!
//! let schema = Schema::builder("posts")
//!     .field(
//!         Field::new("title", FieldType::String)
//!             .validator(Validator::required("title is required"))
//!             .validator(Validator::min_length(3, "title is too short")),
//!     )
//!     .field(Field::new("views", FieldType::Number).validator(Validator::default_to(0)))
//!     .build()
//!     .unwrap();
//!
//! let record = Record::new().with("title", "Hello");
//! let validated = schema.validate(&record).unwrap();
//! assert_eq!(validated.get("views"), Some(&Value::Int(0)));
//! ```

use crate::field_type::{duplicate_key, mixed_from_bson, mixed_to_bson, FieldType};
use crate::record::Record;
use crate::validation::validate_field_name;
use bson::{Bson, Document as BsonDocument};
use docmap_common::{DocMapError, Result};
use docmap_validation::{
    ErrorType, Rejection, ValidationError, ValidationErrors, ValidationResult, Validator,
    ValidatorChain, Value,
};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Persisted identity key
pub const ID_FIELD: &str = "_id";

/// Bookkeeping key of the previous revision; never persisted
pub const PREVIOUS_REVISION_FIELD: &str = "__prevRevision";

/// Field names a schema may not declare
pub const RESERVED_FIELDS: &[&str] = &[ID_FIELD, PREVIOUS_REVISION_FIELD];

// ============================================================================
// Field
// ============================================================================

/// A declared field: name, type, validators and persistence options
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    persisted_name: Option<String>,
    field_type: FieldType,
    chain: ValidatorChain,
    transient: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            persisted_name: None,
            field_type,
            chain: ValidatorChain::new(),
            transient: false,
        }
    }

    /// Append a validator to this field's chain
    pub fn validator(mut self, validator: Validator) -> Self {
        self.chain.push(validator);
        self
    }

    /// Store the field under a different key
    pub fn rename(mut self, persisted_name: impl Into<String>) -> Self {
        self.persisted_name = Some(persisted_name.into());
        self
    }

    /// Validate the field but never persist it
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key used in the persisted document
    pub fn persisted_name(&self) -> &str {
        self.persisted_name.as_deref().unwrap_or(&self.name)
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn chain(&self) -> &ValidatorChain {
        &self.chain
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

// ============================================================================
// Record Rules
// ============================================================================

type RuleFn = dyn Fn(&Record) -> std::result::Result<(), Rejection> + Send + Sync;

/// Record-level check run once every field chain has passed
#[derive(Clone)]
pub struct RecordRule {
    name: String,
    check_fn: Arc<RuleFn>,
}

impl RecordRule {
    pub fn new<F>(name: impl Into<String>, check_fn: F) -> Self
    where
        F: Fn(&Record) -> std::result::Result<(), Rejection> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check_fn: Arc::new(check_fn),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, record: &Record) -> std::result::Result<(), Rejection> {
        (self.check_fn)(record)
    }
}

impl fmt::Debug for RecordRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordRule").field("name", &self.name).finish()
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Ordered field declarations plus record-level rules
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    rules: Vec<RecordRule>,
    strict: bool,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            rules: Vec::new(),
            strict: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_by_persisted_name(&self, persisted_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.persisted_name() == persisted_name)
    }

    /// Whether undeclared fields are rejected
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate a record, returning it with defaults applied
    ///
    /// Every field is checked and all failures are reported together. Within
    /// a field the chain stops at its first failure. Record rules only run
    /// when all fields pass.
    pub fn validate(&self, record: &Record) -> ValidationResult<Record> {
        let mut errors = ValidationErrors::new();
        let mut output: BTreeMap<String, Value> = record
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        for field in &self.fields {
            let input = record.get(&field.name).cloned();
            match field.chain.run_field(&self.name, &field.name, input) {
                Ok(Some(value)) => match field.field_type.conform(value) {
                    Ok(value) => {
                        output.insert(field.name.clone(), value);
                    }
                    Err(rejection) => errors.add(ValidationError::new(
                        self.name.clone(),
                        field.name.clone(),
                        rejection.message,
                        rejection.error_type,
                    )),
                },
                Ok(None) => {
                    output.remove(&field.name);
                }
                Err(error) => errors.add(error),
            }
        }

        for key in record.keys().filter(|key| self.field(key).is_none()) {
            let message = match self.field_by_persisted_name(key) {
                Some(field) if !field.transient => format!(
                    "Field '{}' collides with the persisted name of '{}'",
                    key, field.name
                ),
                _ if self.strict => {
                    format!("Field '{}' is not declared in schema '{}'", key, self.name)
                }
                _ => continue,
            };
            errors.add(ValidationError::new(
                self.name.clone(),
                key.to_string(),
                message,
                ErrorType::ExtraForbidden,
            ));
        }

        if !errors.is_empty() {
            tracing::debug!(
                schema = %self.name,
                failures = errors.len(),
                "record failed field validation"
            );
            return Err(errors);
        }

        let output = Record::from(output);
        for rule in &self.rules {
            if let Err(rejection) = rule.check(&output) {
                errors.add(ValidationError::new(
                    self.name.clone(),
                    rule.name.clone(),
                    rejection.message,
                    rejection.error_type,
                ));
            }
        }

        errors.into_result().map(|()| output)
    }

    /// Project a record into its persisted shape
    ///
    /// Declared fields come first, in declaration order, under their
    /// persisted names. Transient and reserved fields are dropped. Undeclared
    /// fields are kept with `Mixed` coercion unless the schema is strict.
    pub fn to_persisted(&self, record: &Record) -> Result<BsonDocument> {
        let mut doc = BsonDocument::new();

        for field in &self.fields {
            if let Some(value) = record.get(&field.name) {
                if let Some((key, bson)) = self.persist_entry(&field.name, value)? {
                    doc.insert(key, bson);
                }
            }
        }

        if !self.strict {
            for (name, value) in record.iter() {
                if self.field(name).is_none() && !RESERVED_FIELDS.contains(&name) {
                    if doc.contains_key(name) {
                        return Err(duplicate_key(name));
                    }
                    doc.insert(name.to_string(), mixed_to_bson(value));
                }
            }
        }

        Ok(doc)
    }

    /// Rebuild a record from its persisted shape
    ///
    /// `_id` is left to the document layer.
    pub fn from_persisted(&self, doc: &BsonDocument) -> Result<Record> {
        let mut fields = BTreeMap::new();
        for (key, bson) in doc {
            if let Some((name, value)) = self.load_entry(key, bson)? {
                fields.insert(name, value);
            }
        }
        Ok(Record::from(fields))
    }

    /// Persisted key and value for one in-memory entry, `None` when it is not stored
    pub(crate) fn persist_entry(&self, name: &str, value: &Value) -> Result<Option<(String, Bson)>> {
        if RESERVED_FIELDS.contains(&name) {
            return Ok(None);
        }
        match self.field(name) {
            Some(field) if field.transient => Ok(None),
            Some(field) => {
                let bson = field.field_type.to_persisted(value).map_err(|e| match e {
                    DocMapError::Serialization(msg) => DocMapError::Serialization(format!(
                        "{}.{}: {}",
                        self.name, name, msg
                    )),
                    other => other,
                })?;
                Ok(Some((field.persisted_name().to_string(), bson)))
            }
            None if self.strict => Ok(None),
            None => Ok(Some((name.to_string(), mixed_to_bson(value)))),
        }
    }

    /// In-memory name and value for one persisted entry, `None` when it is skipped
    pub(crate) fn load_entry(&self, key: &str, bson: &Bson) -> Result<Option<(String, Value)>> {
        if RESERVED_FIELDS.contains(&key) {
            return Ok(None);
        }
        match self.field_by_persisted_name(key) {
            Some(field) if field.transient => Ok(None),
            Some(field) => {
                let value = field.field_type.from_persisted(bson).map_err(|e| match e {
                    DocMapError::Deserialization(msg) => DocMapError::Deserialization(format!(
                        "{}.{}: {}",
                        self.name, key, msg
                    )),
                    other => other,
                })?;
                Ok(Some((field.name.clone(), value)))
            }
            None if self.strict => {
                tracing::debug!(schema = %self.name, key, "dropping undeclared persisted field");
                Ok(None)
            }
            None => Ok(Some((key.to_string(), mixed_from_bson(bson)))),
        }
    }
}

// ============================================================================
// Schema Builder
// ============================================================================

/// Builder for [`Schema`], checks names on `build()`
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
    rules: Vec<RecordRule>,
    strict: bool,
}

impl SchemaBuilder {
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a record-level rule
    pub fn rule<F>(mut self, name: impl Into<String>, check_fn: F) -> Self
    where
        F: Fn(&Record) -> std::result::Result<(), Rejection> + Send + Sync + 'static,
    {
        self.rules.push(RecordRule::new(name, check_fn));
        self
    }

    /// Reject undeclared fields during validation and drop them from projections
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Finish the schema
    ///
    /// # Errors
    /// Returns a configuration error for empty, reserved, operator-like or
    /// duplicate field names (in memory or persisted).
    pub fn build(self) -> Result<Schema> {
        let mut names = HashSet::new();
        let mut persisted_names = HashSet::new();

        for field in &self.fields {
            for name in [field.name(), field.persisted_name()] {
                validate_field_name(name)?;
                if RESERVED_FIELDS.contains(&name) {
                    return Err(DocMapError::Configuration(format!(
                        "Field name '{}' is reserved (schema '{}')",
                        name, self.name
                    )));
                }
            }
            if !names.insert(field.name()) {
                return Err(DocMapError::Configuration(format!(
                    "Field '{}' declared twice in schema '{}'",
                    field.name(),
                    self.name
                )));
            }
            if !persisted_names.insert(field.persisted_name()) {
                return Err(DocMapError::Configuration(format!(
                    "Persisted name '{}' used twice in schema '{}'",
                    field.persisted_name(),
                    self.name
                )));
            }
        }

        Ok(Schema {
            name: self.name,
            fields: self.fields,
            rules: self.rules,
            strict: self.strict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn post_schema() -> Schema {
        Schema::builder("posts")
            .field(
                Field::new("title", FieldType::String)
                    .validator(Validator::required("R"))
                    .validator(Validator::min_length(3, "M")),
            )
            .field(Field::new("views", FieldType::Number).validator(Validator::default_to(0)))
            .field(Field::new("slug", FieldType::String).rename("s"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_validate_applies_defaults() {
        let record = Record::new().with("title", "Hello");
        let validated = post_schema().validate(&record).unwrap();
        assert_eq!(validated.get("views"), Some(&Value::Int(0)));
        assert_eq!(validated.get("title"), Some(&Value::from("Hello")));
        assert!(!validated.contains("slug"));
    }

    #[test]
    fn test_validate_collects_all_fields() {
        let record = Record::new().with("views", "many").with("slug", 5);
        let errors = post_schema().validate(&record).unwrap_err();

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.for_field("title").unwrap().message, "R");
        assert_eq!(errors.for_field("views").unwrap().error_type, ErrorType::TypeError);
        assert_eq!(errors.for_field("slug").unwrap().error_type, ErrorType::TypeError);
    }

    #[test]
    fn test_chain_failure_is_first_only() {
        let record = Record::new();
        let errors = post_schema().validate(&record).unwrap_err();
        // required fails, min_length never runs
        assert_eq!(errors.messages(), vec!["R"]);
    }

    #[test]
    fn test_strict_rejects_unknown_fields() {
        let schema = Schema::builder("tags")
            .field(Field::new("label", FieldType::String))
            .strict(true)
            .build()
            .unwrap();
        let errors = schema
            .validate(&Record::new().with("label", "x").with("color", "red"))
            .unwrap_err();
        assert_eq!(errors.for_field("color").unwrap().error_type, ErrorType::ExtraForbidden);
    }

    #[test]
    fn test_rules_run_after_fields() {
        let schema = Schema::builder("events")
            .field(Field::new("start", FieldType::Number))
            .field(Field::new("end", FieldType::Number))
            .rule("end_after_start", |record| {
                match (record.get("start"), record.get("end")) {
                    (Some(Value::Int(s)), Some(Value::Int(e))) if e < s => {
                        Err(Rejection::value("end must not precede start"))
                    }
                    _ => Ok(()),
                }
            })
            .build()
            .unwrap();

        let ok = Record::new().with("start", 1).with("end", 2);
        assert!(schema.validate(&ok).is_ok());

        let bad = Record::new().with("start", 3).with("end", 2);
        let errors = schema.validate(&bad).unwrap_err();
        assert_eq!(errors.first().unwrap().field, "end_after_start");
    }

    #[test]
    fn test_to_persisted_renames_and_orders() {
        let record = Record::new()
            .with("slug", "hello")
            .with("title", "Hello")
            .with("views", 2)
            .with("extra", true);
        let doc = post_schema().to_persisted(&record).unwrap();
        assert_eq!(
            doc,
            doc! { "title": "Hello", "views": 2_i64, "s": "hello", "extra": true }
        );
    }

    #[test]
    fn test_undeclared_key_cannot_take_a_persisted_name() {
        let record = Record::new()
            .with("title", "Hello")
            .with("slug", "hello")
            .with("s", "shadow");

        let errors = post_schema().validate(&record).unwrap_err();
        let collision = errors.for_field("s").unwrap();
        assert_eq!(collision.error_type, ErrorType::ExtraForbidden);
        assert!(collision.message.contains("'slug'"));

        let err = post_schema().to_persisted(&record).unwrap_err();
        assert!(matches!(err, DocMapError::Serialization(_)));
    }

    #[test]
    fn test_to_persisted_strips_reserved_and_transient() {
        let schema = Schema::builder("users")
            .field(Field::new("name", FieldType::String))
            .field(Field::new("password_confirmation", FieldType::String).transient())
            .build()
            .unwrap();
        let record = Record::new()
            .with("name", "ann")
            .with("password_confirmation", "secret")
            .with(PREVIOUS_REVISION_FIELD, "stale")
            .with(ID_FIELD, "x");
        let doc = schema.to_persisted(&record).unwrap();
        assert_eq!(doc, doc! { "name": "ann" });
    }

    #[test]
    fn test_from_persisted_inverts_projection() {
        let schema = post_schema();
        let record = schema
            .validate(&Record::new().with("title", "Hello").with("slug", "hello").with("note", "n"))
            .unwrap();
        let doc = schema.to_persisted(&record).unwrap();
        assert_eq!(schema.from_persisted(&doc).unwrap(), record);
    }

    #[test]
    fn test_from_persisted_skips_id() {
        let doc = doc! { "_id": bson::oid::ObjectId::new(), "title": "Hello" };
        let record = post_schema().from_persisted(&doc).unwrap();
        assert!(!record.contains(ID_FIELD));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_from_persisted_type_error_names_field() {
        let doc = doc! { "views": "lots" };
        let err = post_schema().from_persisted(&doc).unwrap_err();
        assert!(err.to_string().contains("posts.views"));
    }

    #[test]
    fn test_builder_rejects_bad_names() {
        let reserved = Schema::builder("x").field(Field::new("_id", FieldType::ObjectId)).build();
        assert!(matches!(reserved, Err(DocMapError::Configuration(_))));

        let operator = Schema::builder("x").field(Field::new("$set", FieldType::Mixed)).build();
        assert!(operator.is_err());

        let duplicate = Schema::builder("x")
            .field(Field::new("a", FieldType::String))
            .field(Field::new("a", FieldType::Number))
            .build();
        assert!(duplicate.unwrap_err().to_string().contains("declared twice"));

        let clash = Schema::builder("x")
            .field(Field::new("a", FieldType::String))
            .field(Field::new("b", FieldType::String).rename("a"))
            .build();
        assert!(clash.unwrap_err().to_string().contains("used twice"));
    }

    #[test]
    fn test_ref_projects_through_nested_schema() {
        let author = Arc::new(
            Schema::builder("authors")
                .field(Field::new("name", FieldType::String).rename("n"))
                .field(Field::new("id", FieldType::ObjectId))
                .build()
                .unwrap(),
        );
        let schema = Schema::builder("posts")
            .field(Field::new("author", FieldType::reference(author)))
            .build()
            .unwrap();

        let oid = bson::oid::ObjectId::new();
        let author_value = Value::Object(vec![
            ("name".into(), Value::from("ann")),
            ("id".into(), Value::String(oid.to_hex())),
        ]);
        let record = Record::new().with("author", author_value);

        let doc = schema.to_persisted(&record).unwrap();
        assert_eq!(doc, doc! { "author": { "n": "ann", "id": oid } });
        assert_eq!(schema.from_persisted(&doc).unwrap(), record);
    }
}
