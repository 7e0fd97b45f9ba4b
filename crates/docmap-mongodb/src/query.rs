//! Pending read operations
//!
//! A [`Query`] only describes a read. Running it is left to whatever driver
//! the caller pairs it with.

use crate::config::get_config;
use crate::validation::validate_query;
use bson::{Bson, Document as BsonDocument};
use docmap_common::Result;

/// Description of a find operation against one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection_name: String,
    filter: BsonDocument,
    sort: Option<BsonDocument>,
    skip: Option<u64>,
    limit: Option<i64>,
    single: bool,
}

impl Query {
    /// Query for every matching document
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            filter: BsonDocument::new(),
            sort: None,
            skip: None,
            limit: None,
            single: false,
        }
    }

    /// Query for at most one matching document
    pub fn single(collection_name: impl Into<String>) -> Self {
        Self {
            single: true,
            limit: Some(1),
            ..Self::new(collection_name)
        }
    }

    /// Set the filter document
    ///
    /// # Errors
    /// Returns a query error when query validation is enabled and the filter
    /// uses an operator that runs server-side JavaScript.
    pub fn filter(mut self, filter: BsonDocument) -> Result<Self> {
        if get_config().validate_queries {
            validate_query(&Bson::Document(filter.clone()))?;
        }
        self.filter = filter;
        Ok(self)
    }

    /// Set the sort order
    pub fn sort(mut self, sort: BsonDocument) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the number of documents to skip
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of documents to return
    ///
    /// Ignored for single-result queries, which always keep a limit of one.
    pub fn limit(mut self, limit: i64) -> Self {
        if !self.single {
            self.limit = Some(limit);
        }
        self
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn get_filter(&self) -> &BsonDocument {
        &self.filter
    }

    pub fn get_sort(&self) -> Option<&BsonDocument> {
        self.sort.as_ref()
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<i64> {
        self.limit
    }

    /// Whether the query resolves to at most one document
    pub fn is_single(&self) -> bool {
        self.single
    }
}
