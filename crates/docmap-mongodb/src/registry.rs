//! Type-indexed bindings from document types to schema and storage

use crate::collection::{Collection, Connection};
use crate::schema::Schema;
use crate::validation::ValidatedCollectionName;
use docmap_common::{DocMapError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a document type needs to validate and persist itself
pub struct Registration {
    collection_name: ValidatedCollectionName,
    schema: Arc<Schema>,
    connection: Arc<dyn Connection>,
}

impl Registration {
    pub fn new(
        collection_name: &str,
        schema: Schema,
        connection: Arc<dyn Connection>,
    ) -> Result<Self> {
        Ok(Self {
            collection_name: ValidatedCollectionName::new(collection_name)?,
            schema: Arc::new(schema),
            connection,
        })
    }

    pub fn collection_name(&self) -> &str {
        self.collection_name.as_str()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    pub fn collection(&self) -> Result<Arc<dyn Collection>> {
        self.connection.collection(self.collection_name.as_str())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("collection_name", &self.collection_name.as_str())
            .field("schema", &self.schema.name())
            .finish_non_exhaustive()
    }
}

/// Registrations keyed by document type
#[derive(Default)]
pub struct DocumentRegistry {
    entries: RwLock<HashMap<TypeId, Arc<Registration>>>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `T`, returning the registration it replaces
    pub fn register<T: 'static>(&self, registration: Registration) -> Option<Arc<Registration>> {
        tracing::debug!(
            document = type_name::<T>(),
            collection = registration.collection_name(),
            "registering document type"
        );
        self.entries
            .write()
            .insert(TypeId::of::<T>(), Arc::new(registration))
    }

    pub fn lookup<T: 'static>(&self) -> Result<Arc<Registration>> {
        self.entries
            .read()
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or_else(|| {
                DocMapError::Configuration(format!(
                    "Document type '{}' is not registered",
                    type_name::<T>()
                ))
            })
    }

    pub fn unregister<T: 'static>(&self) -> Option<Arc<Registration>> {
        self.entries.write().remove(&TypeId::of::<T>())
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

static GLOBAL_REGISTRY: Lazy<DocumentRegistry> = Lazy::new(DocumentRegistry::new);

/// The registry used by [`Persistable`](crate::Persistable)
pub fn global_registry() -> &'static DocumentRegistry {
    &GLOBAL_REGISTRY
}

pub fn register<T: 'static>(registration: Registration) -> Option<Arc<Registration>> {
    global_registry().register::<T>(registration)
}

pub fn lookup<T: 'static>() -> Result<Arc<Registration>> {
    global_registry().lookup::<T>()
}

pub fn unregister<T: 'static>() -> Option<Arc<Registration>> {
    global_registry().unregister::<T>()
}

pub fn is_registered<T: 'static>() -> bool {
    global_registry().is_registered::<T>()
}
