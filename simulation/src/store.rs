//! Document store abstraction
//!
//! Collections of JSON documents keyed by id, with merge writes, dotted-path
//! updates, simple equality queries and change subscriptions. `MemoryStore`
//! keeps everything in process; a networked backend implements the same trait.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Document must be a JSON object")]
    NotAnObject,

    #[error("Invalid field path: {0}")]
    InvalidPath(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
    /// Document after the change; None when removed
    pub document: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Equality filters, one sort key and a limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.filters.push((path.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, path: &str, order: SortOrder) -> Self {
        self.order_by = Some((path.to_string(), order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Minimal document store contract
pub trait DocumentStore: Send + Sync {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;
    /// Write a document; with `merge` the fields are merged into any existing one
    fn set(&self, collection: &str, id: &str, document: Value, merge: bool) -> Result<(), StoreError>;
    /// Set individual fields by dotted path. The document must exist.
    fn update(&self, collection: &str, id: &str, fields: Vec<(String, Value)>) -> Result<(), StoreError>;
    /// Insert under a generated id
    fn add(&self, collection: &str, document: Value) -> Result<String, StoreError>;
    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Value)>, StoreError>;
    fn subscribe(&self, collection: &str) -> Result<Receiver<ChangeEvent>, StoreError>;
}

/// Read a value by dotted path
pub fn get_path<'v>(document: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(document, |v, key| v.get(key))
}

/// Write a value by dotted path, creating intermediate objects
pub fn set_path(document: &mut Value, path: &str, value: Value) -> Result<(), StoreError> {
    let keys: Vec<&str> = path.split('.').collect();
    if keys.iter().any(|k| k.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    let (last, parents) = keys
        .split_last()
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;

    let mut current = document;
    for key in parents {
        let object = current
            .as_object_mut()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        current = object
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
    }
    current
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?
        .insert(last.to_string(), value);
    Ok(())
}

/// Deep-merge `source` into `target`; objects merge, everything else replaces
pub fn merge_into(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            for (key, value) in s {
                match t.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        t.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => CmpOrdering::Greater,
        (None, Some(_)) => CmpOrdering::Less,
        _ => CmpOrdering::Equal,
    }
}

type Collection = BTreeMap<String, Value>;

/// In-process store for tests and single-player use
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    subscribers: Mutex<HashMap<String, Vec<Sender<ChangeEvent>>>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn publish(&self, event: ChangeEvent) -> Result<(), StoreError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(senders) = subscribers.get_mut(&event.collection) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
        Ok(())
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(collections.get(collection).and_then(|c| c.get(id)).cloned())
    }

    fn set(&self, collection: &str, id: &str, document: Value, merge: bool) -> Result<(), StoreError> {
        if !document.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let event = {
            let mut collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
            let docs = collections.entry(collection.to_string()).or_default();
            let exists = docs.contains_key(id);
            let kind = if exists {
                ChangeKind::Modified
            } else {
                ChangeKind::Added
            };
            let stored = match docs.get_mut(id).filter(|_| merge) {
                Some(existing) => {
                    merge_into(existing, document);
                    existing.clone()
                }
                None => {
                    docs.insert(id.to_string(), document.clone());
                    document
                }
            };
            ChangeEvent {
                collection: collection.to_string(),
                id: id.to_string(),
                kind,
                document: Some(stored),
            }
        };
        self.publish(event)
    }

    fn update(&self, collection: &str, id: &str, fields: Vec<(String, Value)>) -> Result<(), StoreError> {
        let event = {
            let mut collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
            let document = collections
                .get_mut(collection)
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| Self::not_found(collection, id))?;
            for (path, value) in fields {
                set_path(document, &path, value)?;
            }
            ChangeEvent {
                collection: collection.to_string(),
                id: id.to_string(),
                kind: ChangeKind::Modified,
                document: Some(document.clone()),
            }
        };
        self.publish(event)
    }

    fn add(&self, collection: &str, document: Value) -> Result<String, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}-{:06}", collection, n);
        self.set(collection, &id, document, false)?;
        debug!("Added {}/{}", collection, id);
        Ok(id)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let removed = {
            let mut collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
            collections.get_mut(collection).and_then(|c| c.remove(id))
        };
        if removed.is_some() {
            self.publish(ChangeEvent {
                collection: collection.to_string(),
                id: id.to_string(),
                kind: ChangeKind::Removed,
                document: None,
            })?;
        }
        Ok(())
    }

    fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Value)>, StoreError> {
        let collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<(String, Value)> = docs
            .iter()
            .filter(|(_, doc)| {
                query
                    .filters
                    .iter()
                    .all(|(path, expected)| get_path(doc, path) == Some(expected))
            })
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect();

        if let Some((path, order)) = &query.order_by {
            results.sort_by(|(_, a), (_, b)| {
                let ord = compare_values(get_path(a, path), get_path(b, path));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn subscribe(&self, collection: &str) -> Result<Receiver<ChangeEvent>, StoreError> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_merge_and_get() {
        let store = MemoryStore::new();
        store
            .set("players", "p1", json!({ "name": "Ada", "stats": { "level": 1 } }), false)
            .unwrap();
        store
            .set("players", "p1", json!({ "stats": { "xp": 50 } }), true)
            .unwrap();

        let doc = store.get("players", "p1").unwrap().unwrap();
        assert_eq!(doc, json!({ "name": "Ada", "stats": { "level": 1, "xp": 50 } }));

        store.set("players", "p1", json!({ "name": "Bo" }), false).unwrap();
        assert_eq!(store.get("players", "p1").unwrap(), Some(json!({ "name": "Bo" })));
        assert_eq!(store.set("players", "p2", json!(3), false), Err(StoreError::NotAnObject));
    }

    #[test]
    fn test_update_dotted_paths() {
        let store = MemoryStore::new();
        store.set("contracts", "c1", json!({ "progress": {} }), false).unwrap();
        store
            .update(
                "contracts",
                "c1",
                vec![("progress.p1.contribution".to_string(), json!(5))],
            )
            .unwrap();
        let doc = store.get("contracts", "c1").unwrap().unwrap();
        assert_eq!(get_path(&doc, "progress.p1.contribution"), Some(&json!(5)));

        assert!(matches!(
            store.update("contracts", "missing", vec![]),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.update("contracts", "c1", vec![("a..b".to_string(), json!(1))]),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_query_filters_orders_and_limits() {
        let store = MemoryStore::new();
        for (name, money, status) in [("a", 10, "active"), ("b", 30, "active"), ("c", 20, "sold"), ("d", 5, "active")] {
            store
                .add("trades", json!({ "name": name, "money": money, "status": status }))
                .unwrap();
        }

        let results = store
            .query(
                "trades",
                &Query::new()
                    .filter("status", "active")
                    .order_by("money", SortOrder::Descending)
                    .limit(2),
            )
            .unwrap();
        let names: Vec<&str> = results
            .iter()
            .filter_map(|(_, doc)| doc["name"].as_str())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(store.query("nothing", &Query::new()).unwrap().is_empty());
    }

    #[test]
    fn test_subscribers_receive_changes() {
        let store = MemoryStore::new();
        let rx = store.subscribe("gifts").unwrap();

        let id = store.add("gifts", json!({ "status": "pending" })).unwrap();
        store
            .update("gifts", &id, vec![("status".to_string(), json!("accepted"))])
            .unwrap();
        store.delete("gifts", &id).unwrap();
        store.add("trades", json!({})).unwrap();

        let kinds: Vec<ChangeKind> = rx.try_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Added, ChangeKind::Modified, ChangeKind::Removed]);
    }
}
