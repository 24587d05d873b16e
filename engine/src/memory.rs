//! In-process document store.
//!
//! [`MemoryDriver`] keeps every collection in memory behind a mutex. It
//! understands a small query language (field equality, with array fields
//! matching any contained element, plus `$in`, `$ne` and `$exists`), sorts
//! by any number of keys and enforces unique indexes. It backs the test
//! suites and development servers.

use crate::driver::{
    Document, DocumentStream, Driver, DriverError, DriverResult, FindOptions, SortOrder,
};
use crate::id::{ObjectId, ID_FIELD};
use crate::index::{keys_name, IndexKey, IndexSpec};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

/// Documents and indexes of one collection.
#[derive(Debug, Default)]
struct MemoryCollection {
    documents: BTreeMap<ObjectId, Document>,
    indexes: Vec<IndexSpec>,
}

impl MemoryCollection {
    /// Check `document` against every unique index, ignoring `id` itself.
    fn check_unique(&self, collection: &str, id: ObjectId, document: &Document) -> DriverResult<()> {
        for index in self.indexes.iter().filter(|i| i.is_unique()) {
            let Some(key) = index_key(index, document) else {
                continue;
            };
            let clash = self
                .documents
                .iter()
                .any(|(other_id, other)| *other_id != id && index_key(index, other).as_ref() == Some(&key));
            if clash {
                return Err(DriverError::DuplicateKey {
                    collection: collection.to_string(),
                    keys: index.name(),
                });
            }
        }
        Ok(())
    }
}

/// Values a document contributes to an index, or `None` when a sparse index
/// skips it.
fn index_key(index: &IndexSpec, document: &Document) -> Option<Vec<Value>> {
    let values: Vec<Value> = index
        .keys
        .iter()
        .map(|k| document.get(&k.field).cloned().unwrap_or(Value::Null))
        .collect();
    if index.is_sparse() && index.keys.iter().all(|k| !document.contains_key(&k.field)) {
        return None;
    }
    Some(values)
}

/// In-memory [`Driver`].
#[derive(Debug, Default)]
pub struct MemoryDriver {
    collections: Mutex<HashMap<String, MemoryCollection>>,
}

impl MemoryDriver {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> DriverResult<MutexGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .lock()
            .map_err(|_| DriverError::Backend("memory store lock poisoned".into()))
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> DriverResult<usize> {
        Ok(self
            .lock()?
            .get(collection)
            .map_or(0, |c| c.documents.len()))
    }

    fn select(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> DriverResult<Vec<Document>> {
        let collections = self.lock()?;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut selected = Vec::new();
        for document in coll.documents.values() {
            if matches(document, query)? {
                selected.push(document.clone());
            }
        }

        if !options.sort.is_empty() {
            selected.sort_by(|a, b| {
                for (field, order) in &options.sort {
                    let ordering = compare(a.get(field), b.get(field));
                    let ordering = match order {
                        SortOrder::Ascending => ordering,
                        SortOrder::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(selected.into_iter().skip(options.skip).take(limit).collect())
    }
}

impl Driver for MemoryDriver {
    fn upsert(
        &self,
        collection: &str,
        id: Option<ObjectId>,
        mut document: Document,
    ) -> DriverResult<ObjectId> {
        let id = id.unwrap_or_else(ObjectId::new);
        document.insert(ID_FIELD.to_string(), id.to_value());

        let mut collections = self.lock()?;
        let coll = collections.entry(collection.to_string()).or_default();
        coll.check_unique(collection, id, &document)?;
        coll.documents.insert(id, document);
        Ok(id)
    }

    fn delete_by_id(&self, collection: &str, id: ObjectId) -> DriverResult<()> {
        if let Some(coll) = self.lock()?.get_mut(collection) {
            coll.documents.remove(&id);
        }
        Ok(())
    }

    fn delete_by_query(&self, collection: &str, query: &Document) -> DriverResult<u64> {
        let mut collections = self.lock()?;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut doomed = Vec::new();
        for (id, document) in &coll.documents {
            if matches(document, query)? {
                doomed.push(*id);
            }
        }
        for id in &doomed {
            coll.documents.remove(id);
        }
        Ok(doomed.len() as u64)
    }

    fn find_many(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> DriverResult<DocumentStream> {
        let selected = self.select(collection, query, options)?;
        Ok(Box::new(selected.into_iter().map(Ok)))
    }

    fn find_one(
        &self,
        collection: &str,
        query: &Document,
        options: &FindOptions,
    ) -> DriverResult<Option<Document>> {
        let options = options.clone().limit(1);
        Ok(self.select(collection, query, &options)?.into_iter().next())
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> DriverResult<()> {
        let mut collections = self.lock()?;
        let coll = collections.entry(collection.to_string()).or_default();

        if let Some(existing) = coll.indexes.iter().find(|i| i.keys == spec.keys) {
            if existing.options == spec.options {
                return Ok(());
            }
            return Err(DriverError::IndexOptionsConflict {
                collection: collection.to_string(),
                keys: spec.name(),
            });
        }

        if spec.is_unique() {
            let mut seen = Vec::new();
            for document in coll.documents.values() {
                if let Some(key) = index_key(spec, document) {
                    if seen.contains(&key) {
                        return Err(DriverError::DuplicateKey {
                            collection: collection.to_string(),
                            keys: spec.name(),
                        });
                    }
                    seen.push(key);
                }
            }
        }

        coll.indexes.push(spec.clone());
        Ok(())
    }

    fn drop_index(&self, collection: &str, keys: &[IndexKey]) -> DriverResult<()> {
        let mut collections = self.lock()?;
        let position = collections
            .get(collection)
            .and_then(|c| c.indexes.iter().position(|i| i.keys == keys));

        match (collections.get_mut(collection), position) {
            (Some(coll), Some(position)) => {
                coll.indexes.remove(position);
                Ok(())
            }
            _ => Err(DriverError::IndexNotFound {
                collection: collection.to_string(),
                keys: keys_name(keys),
            }),
        }
    }

    fn list_indexes(&self, collection: &str) -> DriverResult<Vec<IndexSpec>> {
        Ok(self
            .lock()?
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default())
    }
}

/// Whether `document` satisfies every condition of `query`.
fn matches(document: &Document, query: &Document) -> DriverResult<bool> {
    for (field, condition) in query {
        let value = document.get(field);
        let satisfied = match condition {
            Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                let mut all = true;
                for (op, arg) in ops {
                    all &= match op.as_str() {
                        "$in" => {
                            let candidates = arg.as_array().ok_or_else(|| {
                                DriverError::InvalidQuery(format!("$in on {field} needs a list"))
                            })?;
                            candidates.iter().any(|c| value_matches(value, c))
                        }
                        "$ne" => !value_matches(value, arg),
                        "$exists" => value.is_some() == arg.as_bool().unwrap_or(true),
                        other => {
                            return Err(DriverError::InvalidQuery(format!(
                                "unsupported operator {other}"
                            )))
                        }
                    };
                }
                all
            }
            expected => value_matches(value, expected),
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn value_matches(value: Option<&Value>, expected: &Value) -> bool {
    match value {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(value) => value == expected,
    }
}

/// Cross-type ordering: missing/null, numbers, strings, objects, arrays, booleans.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
