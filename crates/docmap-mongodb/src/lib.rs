//! MongoDB document mapping for docmap
//!
//! Binds immutable field records to MongoDB collections.
//!
//! # Features
//! - Declarative schemas with per-field validator chains and record rules
//! - Typed projection to and from BSON, with renames and transient fields
//! - Dirty tracking against the last persisted snapshot
//! - Async save/remove through pluggable collection collaborators
//! - In-memory and MongoDB driver collaborators

pub mod collection;
pub mod config;
pub mod connection;
pub mod document;
pub mod field_type;
pub mod query;
pub mod record;
pub mod registry;
pub mod schema;
pub mod validation;

pub use collection::{Collection, Connection, MemoryCollection, MemoryConnection};
pub use config::{configure, get_config, set_config, MapperConfig};
pub use connection::{MongoCollection, MongoConnection};
pub use docmap_common::{DocMapError, Result};
pub use docmap_validation::{
    ErrorType, Rejection, ValidationError, ValidationErrors, Validator, ValidatorChain, Value,
};
pub use document::{DocumentState, Persistable};
pub use field_type::FieldType;
pub use query::Query;
pub use record::Record;
pub use registry::{is_registered, lookup, register, unregister, DocumentRegistry, Registration};
pub use schema::{Field, RecordRule, Schema, SchemaBuilder};
pub use validation::{validate_field_name, validate_query, ValidatedCollectionName};
