//! Storage driver contract.
//!
//! The record layer never stores anything itself. Persistence, querying and
//! index management are delegated to a [`Driver`], which wraps whatever
//! document store backs the application. [`crate::MemoryDriver`] is the
//! in-process implementation used by tests and development servers.

use crate::index::{IndexKey, IndexSpec};
use crate::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A schemaless document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Lazy stream of documents produced by [`Driver::find_many`].
pub type DocumentStream = Box<dyn Iterator<Item = DriverResult<Document>> + Send>;

/// Errors reported by storage drivers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// An index over the same keys already exists with different options.
    #[error("index {keys} on {collection} conflicts with an existing index")]
    IndexOptionsConflict { collection: String, keys: String },

    #[error("index {keys} not found on {collection}")]
    IndexNotFound { collection: String, keys: String },

    /// A write violated a unique index.
    #[error("duplicate key on {collection} for index {keys}")]
    DuplicateKey { collection: String, keys: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for driver calls.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Sort direction for [`FindOptions::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Options for [`Driver::find_many`] and [`Driver::find_one`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOptions {
    /// Number of matching documents to skip
    #[serde(default)]
    pub skip: usize,
    /// Maximum number of documents to return
    #[serde(default)]
    pub limit: Option<usize>,
    /// Sort keys applied in order
    #[serde(default)]
    pub sort: Vec<(String, SortOrder)>,
}

impl FindOptions {
    /// Builder-style method to skip documents.
    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Builder-style method to cap the result size.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builder-style method to append a sort key.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }
}

/// Operations the record layer needs from a document store.
///
/// Documents handed to [`Driver::upsert`] never carry the identity field;
/// documents returned by the driver always do, as a hex string under `_id`.
pub trait Driver: Send + Sync {
    /// Insert `document` when `id` is `None`, replace it otherwise.
    /// Returns the identity of the stored document.
    fn upsert(
        &self,
        collection: &str,
        id: Option<ObjectId>,
        document: Document,
    ) -> DriverResult<ObjectId>;

    /// Delete the document with the given identity, if any.
    fn delete_by_id(&self, collection: &str, id: ObjectId) -> DriverResult<()>;

    /// Delete every document matching `query`. Returns the number removed.
    fn delete_by_query(&self, collection: &str, query: &Document) -> DriverResult<u64>;

    /// Stream the documents matching `query`.
    fn find_many(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> DriverResult<DocumentStream>;

    /// First document matching `query`.
    fn find_one(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> DriverResult<Option<Document>>;

    /// Create an index. Fails with [`DriverError::IndexOptionsConflict`] when
    /// an index over the same keys exists with other options.
    fn create_index(&self, collection: &str, spec: &IndexSpec) -> DriverResult<()>;

    /// Drop the index over exactly `keys`.
    fn drop_index(&self, collection: &str, keys: &[IndexKey]) -> DriverResult<()>;

    /// Indexes currently defined on the collection.
    fn list_indexes(&self, collection: &str) -> DriverResult<Vec<IndexSpec>>;
}
