use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use serde_json::Value;
use tokio::sync::Mutex;
use wimo_core::Document;
use wimo_storage::{DocumentStore, Filter, StorageError, StoredDocument};

pub type StorageKey = String; // Format: "collection/id"

pub(crate) fn make_storage_key(collection: &str, id: &str) -> StorageKey {
    format!("{collection}/{id}")
}

/// A stored body plus its insertion sequence number.
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    seq: u64,
    body: Document,
}

/// In-memory document store using a papaya lock-free HashMap.
///
/// Reads never block. Writes that first look for a match (upsert, delete,
/// update) are serialized through a single mutex so a concurrent upsert on
/// the same natural key cannot insert twice.
#[derive(Debug)]
pub struct InMemoryStore {
    data: Arc<PapayaHashMap<StorageKey, Entry>>,
    seq: AtomicU64,
    write_lock: Mutex<()>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            seq: AtomicU64::new(1),
            write_lock: Mutex::new(()),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Number of documents held in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        let prefix = format!("{collection}/");
        self.data
            .pin()
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .count()
    }

    /// Matching `(id, entry)` pairs in insertion order.
    fn matching(&self, collection: &str, filter: Filter<'_>) -> Vec<(String, Entry)> {
        if let Filter::Id(id) = filter {
            let key = make_storage_key(collection, id);
            return self
                .data
                .pin()
                .get(&key)
                .map(|entry| vec![(id.to_string(), entry.clone())])
                .unwrap_or_default();
        }

        let prefix = format!("{collection}/");
        let guard = self.data.pin();
        let mut found: Vec<(String, Entry)> = guard
            .iter()
            .filter_map(|(key, entry)| {
                let id = key.strip_prefix(&prefix)?;
                filter
                    .matches(id, &entry.body)
                    .then(|| (id.to_string(), entry.clone()))
            })
            .collect();
        found.sort_by_key(|(_, entry)| entry.seq);
        found
    }

    fn insert_new(&self, collection: &str, body: Document) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = Entry {
            seq: self.next_seq(),
            body,
        };
        self.data
            .pin()
            .insert(make_storage_key(collection, &id), entry);
        id
    }

    fn merge_into(&self, collection: &str, id: &str, mut existing: Entry, body: Document) {
        for (field, value) in body {
            existing.body.insert(field, value);
        }
        self.data
            .pin()
            .insert(make_storage_key(collection, id), existing);
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Filter<'_>,
    ) -> Result<Vec<StoredDocument>, StorageError> {
        Ok(self
            .matching(collection, filter)
            .into_iter()
            .map(|(id, entry)| StoredDocument::new(id, entry.body))
            .collect())
    }

    async fn insert(&self, collection: &str, body: Document) -> Result<String, StorageError> {
        Ok(self.insert_new(collection, body))
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> Result<Option<String>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let existing = self.data.pin().get(&make_storage_key(collection, id)).cloned();
        match existing {
            Some(entry) => {
                self.merge_into(collection, id, entry, body);
                Ok(Some(id.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn upsert_by_field(
        &self,
        collection: &str,
        key: &str,
        value: &Value,
        body: Document,
    ) -> Result<String, StorageError> {
        let _guard = self.write_lock.lock().await;
        let existing = self
            .matching(collection, Filter::Field { key, value })
            .into_iter()
            .next();
        match existing {
            Some((id, entry)) => {
                self.merge_into(collection, &id, entry, body);
                Ok(id)
            }
            None => {
                let mut body = body;
                body.entry(key.to_string()).or_insert_with(|| value.clone());
                Ok(self.insert_new(collection, body))
            }
        }
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Filter<'_>,
    ) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let Some((id, _)) = self.matching(collection, filter).into_iter().next() else {
            return Ok(false);
        };
        let removed = self
            .data
            .pin()
            .remove(&make_storage_key(collection, &id))
            .is_some();
        if removed {
            tracing::debug!(collection, id = %id, "Removed document");
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_find_in_insertion_order() {
        let store = InMemoryStore::new();
        for name in ["c", "a", "b"] {
            store
                .insert("user", doc(json!({"username": name})))
                .await
                .unwrap();
        }

        let names: Vec<_> = store
            .find("user", Filter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.body["username"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = InMemoryStore::new();
        store.insert("user", doc(json!({"username": "a"}))).await.unwrap();
        store.insert("token", doc(json!({"username": "a"}))).await.unwrap();
        store.insert("token_extra", doc(json!({"x": 1}))).await.unwrap();

        assert_eq!(store.count("user"), 1);
        assert_eq!(store.count("token"), 1);
        assert_eq!(store.find("token", Filter::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryStore::new();
        let id = store
            .insert("user", doc(json!({"username": "a", "age": 1})))
            .await
            .unwrap();

        let updated = store
            .update_by_id("user", &id, doc(json!({"age": 2})))
            .await
            .unwrap();
        assert_eq!(updated.as_deref(), Some(id.as_str()));

        let found = store.find("user", Filter::Id(&id)).await.unwrap();
        assert_eq!(found[0].body, doc(json!({"username": "a", "age": 2})));
    }

    #[tokio::test]
    async fn test_update_unknown_id_inserts_nothing() {
        let store = InMemoryStore::new();
        let updated = store
            .update_by_id("user", "nope", doc(json!({"age": 2})))
            .await
            .unwrap();
        assert!(updated.is_none());
        assert_eq!(store.count("user"), 0);
    }

    #[tokio::test]
    async fn test_upsert_keeps_original_position() {
        let store = InMemoryStore::new();
        let first = store
            .upsert_by_field("user", "username", &json!("a"), doc(json!({"username": "a", "age": 1})))
            .await
            .unwrap();
        store.insert("user", doc(json!({"username": "b"}))).await.unwrap();
        let second = store
            .upsert_by_field("user", "username", &json!("a"), doc(json!({"age": 9})))
            .await
            .unwrap();

        assert_eq!(first, second);
        let all = store.find("user", Filter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first);
        assert_eq!(all[0].body, doc(json!({"username": "a", "age": 9})));
    }

    #[tokio::test]
    async fn test_delete_removes_first_match_only() {
        let store = InMemoryStore::new();
        let first = store.insert("token", doc(json!({"username": "a", "n": 1}))).await.unwrap();
        store.insert("token", doc(json!({"username": "a", "n": 2}))).await.unwrap();

        let a = json!("a");
        assert!(
            store
                .delete_one("token", Filter::Field { key: "username", value: &a })
                .await
                .unwrap()
        );
        let left = store.find("token", Filter::All).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_ne!(left[0].id, first);
        assert_eq!(left[0].body["n"], 2);

        assert!(!store.delete_one("token", Filter::Id(&first)).await.unwrap());
    }
}
