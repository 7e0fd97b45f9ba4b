//! Persistable documents
//!
//! A document type is any type that holds a [`DocumentState`] and implements
//! [`Persistable`]. Its schema and storage come from the type's
//! [`Registration`], so the implementing type only wires up its state.
//!
//! Documents are values. Every mutation, `validate` and `save` returns a new
//! document and leaves the receiver untouched. A failed save therefore leaves
//! the caller's value exactly as it was.
//!
//! # Example
//!
//! ```
//! use docmap_mongodb::{
//!     register, DocumentState, Field, FieldType, MemoryConnection, Persistable, Record,
//!     Registration, Schema,
//! };
//! use std::sync::Arc;
//!
//! struct User(DocumentState);
//!
//! impl Persistable for User {
//!     fn state(&self) -> &DocumentState {
//!         &self.0
//!     }
//!
//!     fn from_state(state: DocumentState) -> Self {
//!         User(state)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let schema = Schema::builder("users")
//!     .field(Field::new("name", FieldType::String))
//!     .build()
//!     .unwrap();
//! let connection = Arc::new(MemoryConnection::new());
//! register::<User>(Registration::new("users", schema, connection).unwrap());
//!
//! let user = User::new(Record::new().with("name", "ann"));
//! assert!(!user.is_clean());
//!
//! let saved = user.save().await.unwrap();
//! assert!(saved.is_saved() && saved.is_clean());
//!
//! let renamed = saved.set("name", "bea");
//! assert!(!renamed.is_clean());
//! # }
//! ```

use crate::collection::{Collection, Connection};
use crate::config::get_config;
use crate::query::Query;
use crate::record::Record;
use crate::registry::{self, Registration};
use crate::schema::{Schema, ID_FIELD};
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document as BsonDocument};
use docmap_common::{DocMapError, Result};
use docmap_validation::Value;
use std::any::type_name;
use std::sync::Arc;

// ============================================================================
// Document State
// ============================================================================

/// Identity, current fields and the last snapshot known to match storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentState {
    identity: Option<ObjectId>,
    record: Record,
    previous_revision: Option<Record>,
}

impl DocumentState {
    /// Unsaved state around `record`
    pub fn new(record: Record) -> Self {
        Self {
            identity: None,
            record,
            previous_revision: None,
        }
    }

    /// Clean state for a record that matches storage
    pub fn persisted(identity: ObjectId, record: Record) -> Self {
        Self {
            identity: Some(identity),
            record,
            previous_revision: None,
        }
    }

    pub fn identity(&self) -> Option<ObjectId> {
        self.identity
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn previous_revision(&self) -> Option<&Record> {
        self.previous_revision.as_ref()
    }

    pub fn is_saved(&self) -> bool {
        self.identity.is_some()
    }

    /// Whether storage already holds these fields
    ///
    /// Unsaved state is never clean. Saved state without a snapshot is clean;
    /// otherwise the record is compared against the snapshot.
    pub fn is_clean(&self) -> bool {
        match (&self.identity, &self.previous_revision) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(previous)) => *previous == self.record,
        }
    }

    /// Same state with the snapshot dropped
    pub fn cleanup(&self) -> Self {
        Self {
            identity: self.identity,
            record: self.record.clone(),
            previous_revision: None,
        }
    }

    /// Same identity with new fields
    ///
    /// The first change to a saved state snapshots the fields it replaces.
    /// Later changes keep that snapshot.
    pub fn with_record(&self, record: Record) -> Self {
        let previous_revision = match (&self.identity, &self.previous_revision) {
            (Some(_), None) => Some(self.record.clone()),
            (_, previous) => previous.clone(),
        };
        Self {
            identity: self.identity,
            record,
            previous_revision,
        }
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_record(self.record.with(name, value))
    }

    pub fn merge<I, K, V>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_record(self.record.merge(fields))
    }

    pub fn unset(&self, name: &str) -> Self {
        if !self.record.contains(name) {
            return self.clone();
        }
        self.with_record(self.record.without(name))
    }
}

// ============================================================================
// Persistable
// ============================================================================

/// Behaviour shared by every registered document type
#[async_trait]
pub trait Persistable: Sized + Send + Sync + 'static {
    fn state(&self) -> &DocumentState;

    fn from_state(state: DocumentState) -> Self;

    /// Unsaved document around `record`
    fn new(record: Record) -> Self {
        Self::from_state(DocumentState::new(record))
    }

    fn registration() -> Result<Arc<Registration>> {
        registry::lookup::<Self>()
    }

    fn get_schema() -> Result<Arc<Schema>> {
        Ok(Self::registration()?.schema().clone())
    }

    fn get_connection() -> Result<Arc<dyn Connection>> {
        Ok(Self::registration()?.connection().clone())
    }

    fn get_collection_name() -> Result<String> {
        Ok(Self::registration()?.collection_name().to_string())
    }

    fn get_collection() -> Result<Arc<dyn Collection>> {
        Self::registration()?.collection()
    }

    fn identity(&self) -> Option<ObjectId> {
        self.state().identity()
    }

    fn record(&self) -> &Record {
        self.state().record()
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.record().get(name)
    }

    fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::from_state(self.state().set(name, value))
    }

    fn merge<I, K, V>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::from_state(self.state().merge(fields))
    }

    fn unset(&self, name: &str) -> Self {
        Self::from_state(self.state().unset(name))
    }

    fn is_saved(&self) -> bool {
        self.state().is_saved()
    }

    fn is_clean(&self) -> bool {
        self.state().is_clean()
    }

    fn cleanup(&self) -> Self {
        Self::from_state(self.state().cleanup())
    }

    /// Run the schema, returning the document with defaults applied
    async fn validate(&self) -> Result<Self> {
        let schema = Self::get_schema()?;
        let record = schema.validate(self.record())?;
        Ok(Self::from_state(self.state().with_record(record)))
    }

    /// Persisted shape, `_id` first when the document has one
    fn to_persisted(&self) -> Result<BsonDocument> {
        let projected = Self::get_schema()?.to_persisted(self.record())?;
        Ok(with_identity(self.identity(), projected))
    }

    /// Clean document from its persisted shape
    fn from_persisted(doc: &BsonDocument) -> Result<Self> {
        let record = Self::get_schema()?.from_persisted(doc)?;
        let state = match doc.get(ID_FIELD) {
            None => DocumentState::new(record),
            Some(Bson::ObjectId(id)) => DocumentState::persisted(*id, record),
            Some(other) => {
                return Err(DocMapError::Deserialization(format!(
                    "'{}' of {} must be an ObjectId, got {:?}",
                    ID_FIELD,
                    type_name::<Self>(),
                    other.element_type()
                )))
            }
        };
        Ok(Self::from_state(state))
    }

    /// Validate, persist and return the clean, identified result
    ///
    /// Validation can be turned off with
    /// [`MapperConfig::validate_on_save`](crate::MapperConfig). Collection
    /// errors are returned as they are.
    async fn save(&self) -> Result<Self> {
        let registration = Self::registration()?;
        let schema = registration.schema();

        let record = if get_config().validate_on_save {
            schema.validate(self.record())?
        } else {
            self.record().clone()
        };
        let doc = with_identity(self.identity(), schema.to_persisted(&record)?);

        let collection = registration.collection()?;
        let identity = collection.upsert(doc).await?;
        tracing::debug!(
            document = type_name::<Self>(),
            collection = collection.name(),
            %identity,
            inserted = self.identity().is_none(),
            "saved document"
        );

        Ok(Self::from_state(DocumentState::persisted(identity, record)))
    }

    /// Delete the stored copy
    ///
    /// The in-memory value keeps its identity, so saving it again stores it
    /// under the same identity.
    async fn remove(&self) -> Result<()> {
        let identity = self.identity().ok_or_else(|| {
            DocMapError::NotPersisted(format!(
                "cannot remove an unsaved {}",
                type_name::<Self>()
            ))
        })?;

        let collection = Self::get_collection()?;
        collection.remove_by_identity(identity).await?;
        tracing::debug!(
            document = type_name::<Self>(),
            collection = collection.name(),
            %identity,
            "removed document"
        );
        Ok(())
    }

    fn find(filter: BsonDocument) -> Result<Query> {
        Self::get_collection()?.find(filter)
    }

    fn find_one(filter: BsonDocument) -> Result<Query> {
        Self::get_collection()?.find_one(filter)
    }
}

fn with_identity(identity: Option<ObjectId>, projected: BsonDocument) -> BsonDocument {
    match identity {
        None => projected,
        Some(id) => {
            let mut doc = BsonDocument::new();
            doc.insert(ID_FIELD, id);
            for (key, value) in projected {
                doc.insert(key, value);
            }
            doc
        }
    }
}
