//! Database handle and per-type query facade.

use crate::driver::{Document, DocumentStream, Driver, DriverError, FindOptions};
use crate::id::{ObjectId, ID_FIELD};
use crate::indexer::{self, EnsureOptions, IndexReport};
use crate::record::{Model, Record};
use crate::{error::Result, Error};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Shared handle to a storage driver.
#[derive(Clone)]
pub struct Database {
    driver: Arc<dyn Driver>,
}

impl Database {
    /// Wrap a driver.
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self {
            driver: Arc::new(driver),
        }
    }

    /// Wrap an already shared driver.
    pub fn from_shared(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// The underlying driver.
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Query facade for the record type `M`.
    pub fn collection<M: Model>(&self) -> Collection<'_, M> {
        Collection {
            db: self,
            _model: PhantomData,
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

/// Query matching a single identity.
pub fn id_query(id: ObjectId) -> Value {
    let mut query = Document::new();
    query.insert(ID_FIELD.to_string(), id.to_value());
    Value::Object(query)
}

/// Turn a JSON query into a document. `null` means "match everything".
fn to_query(query: Value) -> Result<Document> {
    match query {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Document::new()),
        other => Err(DriverError::InvalidQuery(format!(
            "query must be an object, got {other}"
        ))
        .into()),
    }
}

/// Class-level operations for one record type.
pub struct Collection<'a, M: Model> {
    db: &'a Database,
    _model: PhantomData<fn() -> M>,
}

impl<'a, M: Model> Collection<'a, M> {
    /// Storage collection name.
    pub fn name(&self) -> &'static str {
        M::collection()
    }

    /// Records matching `query`, decoded lazily.
    pub fn find(&self, query: Value) -> Result<Cursor<M>> {
        self.find_with(query, &FindOptions::default())
    }

    /// Records matching `query` with skip, limit and sort applied.
    pub fn find_with(&self, query: Value, options: &FindOptions) -> Result<Cursor<M>> {
        let query = to_query(query)?;
        let stream = self.db.driver().find_many(M::collection(), &query, options)?;
        Ok(Cursor::new(stream))
    }

    /// First record matching `query`.
    pub fn find_one(&self, query: Value) -> Result<Option<Record<M>>> {
        let query = to_query(query)?;
        let document = self
            .db
            .driver()
            .find_one(M::collection(), &query, &FindOptions::default())?;
        Ok(document.map(Record::with_values))
    }

    /// Record with the given identity.
    pub fn get_by_id(&self, id: ObjectId) -> Result<Option<Record<M>>> {
        self.find_one(id_query(id))
    }

    /// Resolve an identity or key-field value.
    ///
    /// An expression that parses as an identity is looked up by identity;
    /// anything else is matched against the key field.
    pub fn get(&self, expression: &str) -> Result<Option<Record<M>>> {
        if let Some(id) = ObjectId::parse(expression) {
            return self.get_by_id(id);
        }

        let key_field = M::schema()
            .key_field()
            .ok_or_else(|| Error::KeyFieldUndefined {
                model: M::NAME,
                expression: expression.to_string(),
            })?;

        let mut query = Document::new();
        query.insert(key_field.to_string(), Value::String(expression.to_string()));
        self.find_one(Value::Object(query))
    }

    /// Delete every document of this type. Irreversible; meant for tests and
    /// fixtures.
    pub fn destroy_all(&self) -> Result<u64> {
        let removed = self
            .db
            .driver()
            .delete_by_query(M::collection(), &Document::new())?;
        tracing::debug!(collection = M::collection(), removed, "destroyed all records");
        Ok(removed)
    }

    /// Reconcile the declared indexes with the storage engine.
    pub fn ensure_indexes(&self, options: EnsureOptions) -> Result<IndexReport> {
        indexer::ensure_indexes(
            self.db.driver(),
            M::collection(),
            M::schema().indexes(),
            options,
        )
    }
}

/// Lazy sequence of records.
pub struct Cursor<M: Model> {
    stream: DocumentStream,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Cursor<M> {
    fn new(stream: DocumentStream) -> Self {
        Self {
            stream,
            _model: PhantomData,
        }
    }
}

impl<M: Model> Iterator for Cursor<M> {
    type Item = Result<Record<M>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream
            .next()
            .map(|document| document.map(Record::with_values).map_err(Error::from))
    }
}
