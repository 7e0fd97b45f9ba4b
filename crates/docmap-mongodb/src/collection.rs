//! Persistence collaborators
//!
//! Documents never talk to a driver directly. They go through a
//! [`Connection`], which hands out [`Collection`]s by name. This module holds
//! the two traits and an in-process implementation backed by a hash map.

use crate::query::Query;
use crate::schema::ID_FIELD;
use crate::validation::ValidatedCollectionName;
use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document as BsonDocument};
use docmap_common::{DocMapError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A named store of persisted documents
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or replace a document, returning its identity
    ///
    /// A document without `_id` is inserted under a fresh identity.
    async fn upsert(&self, doc: BsonDocument) -> Result<ObjectId>;

    /// Delete the document with this identity; deleting a missing one is not an error
    async fn remove_by_identity(&self, id: ObjectId) -> Result<()>;

    fn find(&self, filter: BsonDocument) -> Result<Query> {
        Query::new(self.name()).filter(filter)
    }

    fn find_one(&self, filter: BsonDocument) -> Result<Query> {
        Query::single(self.name()).filter(filter)
    }
}

/// Source of collections
pub trait Connection: Send + Sync {
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>>;
}

/// Reads the identity of a document about to be stored
pub(crate) fn identity_of(doc: &BsonDocument) -> Result<Option<ObjectId>> {
    match doc.get(ID_FIELD) {
        None => Ok(None),
        Some(Bson::ObjectId(id)) => Ok(Some(*id)),
        Some(other) => Err(DocMapError::Persistence(format!(
            "'{}' must be an ObjectId, got {:?}",
            ID_FIELD,
            other.element_type()
        ))),
    }
}

// ============================================================================
// In-memory implementation
// ============================================================================

/// In-process collection
#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    documents: RwLock<HashMap<ObjectId, BsonDocument>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Stored copy of a document
    pub fn get(&self, id: &ObjectId) -> Option<BsonDocument> {
        self.documents.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.documents.read().keys().copied().collect()
    }
}

#[async_trait]
impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, mut doc: BsonDocument) -> Result<ObjectId> {
        let id = match identity_of(&doc)? {
            Some(id) => id,
            None => {
                let id = ObjectId::new();
                doc.insert(ID_FIELD, id);
                id
            }
        };
        self.documents.write().insert(id, doc);
        tracing::debug!(collection = %self.name, %id, "stored document");
        Ok(id)
    }

    async fn remove_by_identity(&self, id: ObjectId) -> Result<()> {
        if self.documents.write().remove(&id).is_none() {
            tracing::debug!(collection = %self.name, %id, "remove of unknown document");
        }
        Ok(())
    }
}

/// In-process connection; collections are created on first use and shared
#[derive(Debug, Default)]
pub struct MemoryConnection {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to a collection, for inspecting stored documents
    pub fn memory_collection(&self, name: &str) -> Result<Arc<MemoryCollection>> {
        let name = ValidatedCollectionName::new(name)?;
        if let Some(existing) = self.collections.read().get(name.as_str()) {
            return Ok(existing.clone());
        }
        let mut collections = self.collections.write();
        let collection = collections
            .entry(name.into_string())
            .or_insert_with_key(|key| Arc::new(MemoryCollection::new(key.clone())));
        Ok(collection.clone())
    }
}

impl Connection for MemoryConnection {
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        let collection: Arc<dyn Collection> = self.memory_collection(name)?;
        Ok(collection)
    }
}
