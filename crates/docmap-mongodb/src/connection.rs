//! MongoDB-backed collaborators
//!
//! The driver client is opened and closed by the caller. These adapters only
//! borrow a [`Database`] handle and route document writes through it.

use crate::collection::{identity_of, Collection, Connection};
use crate::validation::ValidatedCollectionName;
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document as BsonDocument};
use docmap_common::{DocMapError, Result};
use mongodb::{Client, Database};
use std::sync::Arc;

/// [`Connection`] over a driver database handle
#[derive(Debug, Clone)]
pub struct MongoConnection {
    database: Database,
    database_name: String,
}

impl MongoConnection {
    pub fn new(database: Database) -> Self {
        let database_name = database.name().to_string();
        Self {
            database,
            database_name,
        }
    }

    /// Use the client's default database
    ///
    /// # Errors
    /// Returns a configuration error when the connection string named no database.
    pub fn from_client(client: &Client) -> Result<Self> {
        let database = client.default_database().ok_or_else(|| {
            DocMapError::Configuration(
                "No default database specified in connection string".to_string(),
            )
        })?;
        Ok(Self::new(database))
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }
}

impl Connection for MongoConnection {
    fn collection(&self, name: &str) -> Result<Arc<dyn Collection>> {
        let name = ValidatedCollectionName::new(name)?;
        Ok(Arc::new(MongoCollection {
            inner: self.database.collection(name.as_str()),
        }))
    }
}

/// [`Collection`] over an untyped driver collection
#[derive(Debug, Clone)]
pub struct MongoCollection {
    inner: mongodb::Collection<BsonDocument>,
}

impl MongoCollection {
    pub fn new(inner: mongodb::Collection<BsonDocument>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Collection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn upsert(&self, doc: BsonDocument) -> Result<ObjectId> {
        match identity_of(&doc)? {
            Some(id) => {
                self.inner
                    .replace_one(doc! { "_id": id }, doc)
                    .upsert(true)
                    .await?;
                Ok(id)
            }
            None => {
                let result = self.inner.insert_one(doc).await?;
                result.inserted_id.as_object_id().ok_or_else(|| {
                    DocMapError::Persistence(format!(
                        "Invalid inserted ID: {}",
                        result.inserted_id
                    ))
                })
            }
        }
    }

    async fn remove_by_identity(&self, id: ObjectId) -> Result<()> {
        let result = self.inner.delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            tracing::debug!(collection = self.inner.name(), %id, "remove matched no document");
        }
        Ok(())
    }
}
