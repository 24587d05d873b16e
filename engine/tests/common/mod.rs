//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use micro_engine::{
    Database, Document, DocumentStream, Driver, DriverResult, FieldDef, FindOptions, IndexDecl,
    IndexKey, IndexSpec, MemoryDriver, Model, ObjectId, Record, Schema,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Counts calls that change storage, then forwards to a [`MemoryDriver`].
#[derive(Default)]
pub struct CountingDriver {
    inner: MemoryDriver,
    pub upserts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub index_creates: AtomicUsize,
    pub index_drops: AtomicUsize,
}

impl CountingDriver {
    pub fn writes(&self) -> usize {
        self.upserts.load(Ordering::SeqCst) + self.deletes.load(Ordering::SeqCst)
    }

    pub fn index_changes(&self) -> usize {
        self.index_creates.load(Ordering::SeqCst) + self.index_drops.load(Ordering::SeqCst)
    }
}

impl Driver for CountingDriver {
    fn upsert(
        &self,
        collection: &str,
        id: Option<ObjectId>,
        document: Document,
    ) -> DriverResult<ObjectId> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(collection, id, document)
    }

    fn delete_by_id(&self, collection: &str, id: ObjectId) -> DriverResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_id(collection, id)
    }

    fn delete_by_query(&self, collection: &str, query: &Document) -> DriverResult<u64> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_by_query(collection, query)
    }

    fn find_many(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> DriverResult<DocumentStream> {
        self.inner.find_many(collection, query, options)
    }

    fn find_one(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> DriverResult<Option<Document>> {
        self.inner.find_one(collection, query, options)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> DriverResult<()> {
        self.index_creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_index(collection, spec)
    }

    fn drop_index(&self, collection: &str, keys: &[IndexKey]) -> DriverResult<()> {
        self.index_drops.fetch_add(1, Ordering::SeqCst);
        self.inner.drop_index(collection, keys)
    }

    fn list_indexes(&self, collection: &str) -> DriverResult<Vec<IndexSpec>> {
        self.inner.list_indexes(collection)
    }
}

/// A database over a fresh counting driver, plus a handle to the counters.
pub fn counting_db() -> (Database, Arc<CountingDriver>) {
    let driver = Arc::new(CountingDriver::default());
    let db = Database::from_shared(driver.clone());
    (db, driver)
}

/// Hook calls observed by [`Server`], oldest first, tagged with the hostname.
pub static EVENTS: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

/// Drain the hook calls recorded for one hostname.
pub fn take_events(hostname: &str) -> Vec<String> {
    let Ok(mut events) = EVENTS.lock() else {
        return Vec::new();
    };
    let (taken, kept): (Vec<_>, Vec<_>) = events.drain(..).partition(|(host, _)| host == hostname);
    *events = kept;
    taken.into_iter().map(|(_, event)| event).collect()
}

fn record_event(record: &Record<Server>, event: String) {
    let host = record.get_str("hostname").unwrap_or_default().to_string();
    if let Ok(mut events) = EVENTS.lock() {
        events.push((host, event));
    }
}

fn flag(record: &Record<Server>, field: &str) -> bool {
    record.get(field) == Some(&json!(true))
}

/// A plain record type with a key field, indexes and a rejected field.
pub struct UserToken;

impl Model for UserToken {
    const NAME: &'static str = "UserToken";

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .field(FieldDef::required("token"))
                .field(FieldDef::required("owner"))
                .field(FieldDef::optional("scopes").default_value(json!([])))
                .field(FieldDef::optional("issued_by").rejected())
                .key_field("token")
                .index(IndexDecl::from("token").unique(true))
                .index(IndexDecl::new(["owner", "-issued_at"]))
                .build()
        })
    }
}

/// A record type whose hooks log to [`EVENTS`]. The `locked` flag vetoes
/// deletion; the `fail_after_*` flags make the post-persistence hooks fail.
pub struct Server;

impl Model for Server {
    const NAME: &'static str = "Server";

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .field(FieldDef::required("hostname"))
                .field(FieldDef::optional("locked").default_value(false))
                .field(FieldDef::optional("fail_after_save").default_value(false))
                .field(FieldDef::optional("fail_after_delete").default_value(false))
                .build()
        })
    }

    fn before_save(record: &mut Record<Self>, _db: &Database) -> micro_engine::Result<()> {
        record_event(record, format!("before_save:{}", record.is_new()));
        Ok(())
    }

    fn after_save(record: &mut Record<Self>, _db: &Database) -> micro_engine::Result<()> {
        record_event(record, format!("after_save:{}", record.is_new()));
        if flag(record, "fail_after_save") {
            return Err(micro_engine::ApiError::new("after_save failed").into());
        }
        Ok(())
    }

    fn before_delete(record: &mut Record<Self>, _db: &Database) -> micro_engine::Result<()> {
        record_event(record, "before_delete".into());
        if flag(record, "locked") {
            return Err(micro_engine::ApiError::conflict("server is locked").into());
        }
        Ok(())
    }

    fn after_delete(record: &mut Record<Self>, _db: &Database) -> micro_engine::Result<()> {
        record_event(record, "after_delete".into());
        if flag(record, "fail_after_delete") {
            return Err(micro_engine::ApiError::new("after_delete failed").into());
        }
        Ok(())
    }
}
