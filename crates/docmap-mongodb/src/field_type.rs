//! Field types and their BSON coercions
//!
//! Each [`FieldType`] knows which in-memory [`Value`]s it accepts and how to
//! move them to and from their persisted [`Bson`] form. `Value::Null` is
//! accepted by every type and persists as `Bson::Null`.

use crate::record::Record;
use crate::schema::Schema;
use bson::{oid::ObjectId, spec::BinarySubtype, Binary, Bson, Document as BsonDocument};
use docmap_common::{DocMapError, Result};
use docmap_validation::{ErrorType, Rejection, ValidationErrors, Value};
use std::sync::Arc;

/// Declared type of a schema field
#[derive(Debug, Clone)]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Integer (persisted as int64) or float (persisted as double)
    Number,
    /// Boolean
    Boolean,
    /// UTC datetime, millisecond precision
    Date,
    /// Any value, mapped to its natural BSON counterpart
    Mixed,
    /// 24 hex character string persisted as an ObjectId
    ObjectId,
    /// Array whose items all have the inner type
    List(Box<FieldType>),
    /// Object whose values all have the inner type
    Map(Box<FieldType>),
    /// Array of unique items of the inner type
    Set(Box<FieldType>),
    /// Embedded document projected through another schema
    Ref(Arc<Schema>),
}

impl FieldType {
    pub fn list(items: FieldType) -> Self {
        Self::List(Box::new(items))
    }

    pub fn map(values: FieldType) -> Self {
        Self::Map(Box::new(values))
    }

    pub fn set(items: FieldType) -> Self {
        Self::Set(Box::new(items))
    }

    pub fn reference(schema: Arc<Schema>) -> Self {
        Self::Ref(schema)
    }

    /// Get the human-readable type name
    pub fn type_name(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Number => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Date => "date".to_string(),
            Self::Mixed => "mixed".to_string(),
            Self::ObjectId => "objectid".to_string(),
            Self::List(items) => format!("list<{}>", items.type_name()),
            Self::Map(values) => format!("map<{}>", values.type_name()),
            Self::Set(items) => format!("set<{}>", items.type_name()),
            Self::Ref(schema) => format!("ref<{}>", schema.name()),
        }
    }

    /// Check `value` against this type and return its canonical form
    ///
    /// ObjectIds are lowercased and `Ref` values run through the referenced
    /// schema, picking up its defaults. A rejection names the offending spot
    /// relative to the checked value (e.g. `"[2]: expected string, got integer"`).
    pub fn conform(&self, value: Value) -> std::result::Result<Value, Rejection> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Self::Mixed, value) => check_mixed(&value).map(|()| value),
            (Self::String, value @ Value::String(_)) => Ok(value),
            (Self::Number, value @ (Value::Int(_) | Value::Float(_))) => Ok(value),
            (Self::Boolean, value @ Value::Bool(_)) => Ok(value),
            (Self::Date, value @ Value::DateTime(_)) => Ok(value),
            (Self::ObjectId, Value::String(s)) => {
                if is_objectid_hex(&s) {
                    Ok(Value::String(s.to_ascii_lowercase()))
                } else {
                    Err(Rejection::type_mismatch(format!("'{}' is not a valid ObjectId", s)))
                }
            }
            (Self::List(items), Value::List(values)) => conform_items(items, values).map(Value::List),
            (Self::Set(items), Value::List(values)) => {
                let values = conform_items(items, values)?;
                for (index, item) in values.iter().enumerate() {
                    if values[..index].contains(item) {
                        return Err(Rejection::type_mismatch(format!(
                            "[{}]: duplicate item in set",
                            index
                        )));
                    }
                }
                Ok(Value::List(values))
            }
            (Self::Map(inner), Value::Object(entries)) => {
                check_unique_keys(&entries)?;
                entries
                    .into_iter()
                    .map(|(key, item)| match inner.conform(item) {
                        Ok(item) => Ok((key, item)),
                        Err(rejection) => Err(at_key(&key, rejection)),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(Value::Object)
            }
            (Self::Ref(schema), Value::Object(entries)) => {
                check_unique_keys(&entries)?;
                let record: Record = entries.into_iter().collect();
                schema
                    .validate(&record)
                    .map(|validated| validated.to_value())
                    .map_err(nested_rejection)
            }
            (expected, got) => Err(Rejection::type_mismatch(format!(
                "expected {}, got {}",
                expected.type_name(),
                got.type_name()
            ))),
        }
    }

    /// Whether `value` conforms to this type, with the rejection message on failure
    pub fn check(&self, value: &Value) -> std::result::Result<(), String> {
        self.conform(value.clone())
            .map(|_| ())
            .map_err(|rejection| rejection.message)
    }

    /// Coerce an in-memory value into its persisted form
    pub fn to_persisted(&self, value: &Value) -> Result<Bson> {
        match (self, value) {
            (_, Value::Null) => Ok(Bson::Null),
            (Self::Mixed, v) => Ok(mixed_to_bson(v)),
            (Self::String, Value::String(s)) => Ok(Bson::String(s.clone())),
            (Self::Number, Value::Int(i)) => Ok(Bson::Int64(*i)),
            (Self::Number, Value::Float(f)) => Ok(Bson::Double(*f)),
            (Self::Boolean, Value::Bool(b)) => Ok(Bson::Boolean(*b)),
            (Self::Date, Value::DateTime(ms)) => Ok(Bson::DateTime(bson::DateTime::from_millis(*ms))),
            (Self::ObjectId, Value::String(s)) => ObjectId::parse_str(s)
                .map(Bson::ObjectId)
                .map_err(|e| DocMapError::Serialization(format!("invalid ObjectId '{}': {}", s, e))),
            (Self::List(items) | Self::Set(items), Value::List(values)) => values
                .iter()
                .map(|v| items.to_persisted(v))
                .collect::<Result<Vec<_>>>()
                .map(Bson::Array),
            (Self::Map(inner), Value::Object(entries)) => {
                let mut doc = BsonDocument::new();
                for (key, item) in entries {
                    if doc.contains_key(key) {
                        return Err(duplicate_key(key));
                    }
                    doc.insert(key.clone(), inner.to_persisted(item)?);
                }
                Ok(Bson::Document(doc))
            }
            (Self::Ref(schema), Value::Object(entries)) => {
                let mut doc = BsonDocument::new();
                for (key, item) in entries {
                    if let Some((persisted_key, bson)) = schema.persist_entry(key, item)? {
                        if doc.contains_key(&persisted_key) {
                            return Err(duplicate_key(&persisted_key));
                        }
                        doc.insert(persisted_key, bson);
                    }
                }
                Ok(Bson::Document(doc))
            }
            (expected, got) => Err(DocMapError::Serialization(format!(
                "cannot persist {} as {}",
                got.type_name(),
                expected.type_name()
            ))),
        }
    }

    /// Coerce a persisted value back into its in-memory form
    pub fn from_persisted(&self, bson: &Bson) -> Result<Value> {
        match (self, bson) {
            (_, Bson::Null | Bson::Undefined) => Ok(Value::Null),
            (Self::Mixed, b) => Ok(mixed_from_bson(b)),
            (Self::String, Bson::String(s)) => Ok(Value::String(s.clone())),
            (Self::String, Bson::Symbol(s)) => Ok(Value::String(s.clone())),
            (Self::Number, Bson::Int32(i)) => Ok(Value::Int(*i as i64)),
            (Self::Number, Bson::Int64(i)) => Ok(Value::Int(*i)),
            (Self::Number, Bson::Double(f)) => Ok(Value::Float(*f)),
            (Self::Number, Bson::Decimal128(d)) => d
                .to_string()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| DocMapError::Deserialization(format!("invalid decimal '{}': {}", d, e))),
            (Self::Boolean, Bson::Boolean(b)) => Ok(Value::Bool(*b)),
            (Self::Date, Bson::DateTime(dt)) => Ok(Value::DateTime(dt.timestamp_millis())),
            (Self::Date, Bson::String(s)) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::DateTime(dt.timestamp_millis()))
                .map_err(|e| DocMapError::Deserialization(format!("invalid date '{}': {}", s, e))),
            (Self::ObjectId, Bson::ObjectId(oid)) => Ok(Value::String(oid.to_hex())),
            (Self::ObjectId, Bson::String(s)) if is_objectid_hex(s) => {
                Ok(Value::String(s.to_ascii_lowercase()))
            }
            (Self::List(items), Bson::Array(values)) => values
                .iter()
                .map(|b| items.from_persisted(b))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (Self::Set(items), Bson::Array(values)) => {
                let mut unique: Vec<Value> = Vec::with_capacity(values.len());
                for b in values {
                    let item = items.from_persisted(b)?;
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Ok(Value::List(unique))
            }
            (Self::Map(inner), Bson::Document(doc)) => doc
                .iter()
                .map(|(k, b)| -> Result<(String, Value)> { Ok((k.clone(), inner.from_persisted(b)?)) })
                .collect::<Result<Vec<_>>>()
                .map(Value::Object),
            (Self::Ref(schema), Bson::Document(doc)) => {
                let mut entries = Vec::with_capacity(doc.len());
                for (key, b) in doc {
                    if let Some(entry) = schema.load_entry(key, b)? {
                        entries.push(entry);
                    }
                }
                Ok(Value::Object(entries))
            }
            (expected, got) => Err(DocMapError::Deserialization(format!(
                "expected {}, got BSON {:?}",
                expected.type_name(),
                got.element_type()
            ))),
        }
    }
}

fn conform_items(
    items: &FieldType,
    values: Vec<Value>,
) -> std::result::Result<Vec<Value>, Rejection> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            items.conform(item).map_err(|rejection| Rejection {
                message: format!("[{}]: {}", index, rejection.message),
                error_type: rejection.error_type,
            })
        })
        .collect()
}

fn at_key(key: &str, rejection: Rejection) -> Rejection {
    Rejection {
        message: format!(".{}: {}", key, rejection.message),
        error_type: rejection.error_type,
    }
}

/// BSON documents keep one value per key, so objects must too
fn check_unique_keys(entries: &[(String, Value)]) -> std::result::Result<(), Rejection> {
    for (index, (key, _)) in entries.iter().enumerate() {
        if entries[..index].iter().any(|(k, _)| k == key) {
            return Err(Rejection::type_mismatch(format!(".{}: duplicate key", key)));
        }
    }
    Ok(())
}

fn check_mixed(value: &Value) -> std::result::Result<(), Rejection> {
    match value {
        Value::Object(entries) => {
            check_unique_keys(entries)?;
            for (key, item) in entries {
                check_mixed(item).map_err(|rejection| at_key(key, rejection))?;
            }
            Ok(())
        }
        Value::List(items) => {
            for (index, item) in items.iter().enumerate() {
                check_mixed(item).map_err(|rejection| Rejection {
                    message: format!("[{}]: {}", index, rejection.message),
                    error_type: rejection.error_type,
                })?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Folds the errors of a referenced schema into one rejection
fn nested_rejection(errors: ValidationErrors) -> Rejection {
    let error_type = errors
        .first()
        .map(|error| error.error_type)
        .unwrap_or(ErrorType::TypeError);
    let message = errors
        .as_slice()
        .iter()
        .map(|error| format!(".{}: {}", error.field, error.message))
        .collect::<Vec<_>>()
        .join("; ");
    Rejection { message, error_type }
}

/// Checks if a string has valid ObjectId format (24 hex characters)
fn is_objectid_hex(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|c| c.is_ascii_hexdigit())
}

pub(crate) fn duplicate_key(key: &str) -> DocMapError {
    DocMapError::Serialization(format!("key '{}' would be written twice", key))
}

/// Natural mapping used for `Mixed` fields and undeclared fields
pub(crate) fn mixed_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::String(s) => Bson::String(s.clone()),
        Value::Bytes(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: bytes.clone(),
        }),
        Value::DateTime(ms) => Bson::DateTime(bson::DateTime::from_millis(*ms)),
        Value::List(items) => Bson::Array(items.iter().map(mixed_to_bson).collect()),
        Value::Object(entries) => Bson::Document(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), mixed_to_bson(v)))
                .collect(),
        ),
    }
}

/// Inverse of [`mixed_to_bson`]; BSON-only types become strings
pub(crate) fn mixed_from_bson(bson: &Bson) -> Value {
    match bson {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Int(*i as i64),
        Bson::Int64(i) => Value::Int(*i),
        Bson::Double(f) => Value::Float(*f),
        Bson::String(s) | Bson::Symbol(s) => Value::String(s.clone()),
        Bson::Binary(bin) => Value::Bytes(bin.bytes.clone()),
        Bson::DateTime(dt) => Value::DateTime(dt.timestamp_millis()),
        Bson::Array(items) => Value::List(items.iter().map(mixed_from_bson).collect()),
        Bson::Document(doc) => Value::Object(
            doc.iter()
                .map(|(k, v)| (k.clone(), mixed_from_bson(v)))
                .collect(),
        ),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::Decimal128(d) => Value::String(d.to_string()),
        other => Value::String(other.to_string()),
    }
}
