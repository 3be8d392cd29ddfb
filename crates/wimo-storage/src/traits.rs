//! Document store trait implemented by every persistence backend.

use async_trait::async_trait;
use serde_json::Value;
use wimo_core::Document;

use crate::error::StorageError;

/// Selects documents within a collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter<'a> {
    /// Every document in the collection.
    All,
    /// The document whose backend-native identifier equals the given id.
    Id(&'a str),
    /// Documents whose top-level field `key` equals `value`.
    Field { key: &'a str, value: &'a Value },
}

impl Filter<'_> {
    /// Returns `true` if `body` (stored under `id`) is selected by this filter.
    #[must_use]
    pub fn matches(&self, id: &str, body: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Id(wanted) => *wanted == id,
            Self::Field { key, value } => body.get(*key) == Some(*value),
        }
    }
}

/// A document as held by a backend: its identifier plus the body without it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub body: Document,
}

impl StoredDocument {
    #[must_use]
    pub fn new(id: impl Into<String>, body: Document) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }
}

/// Backend contract used by the persistence facade.
///
/// Bodies passed in and returned never contain the neutral `id` field; the
/// facade owns that translation. Implementations must be thread-safe and
/// must report connectivity problems as [`StorageError::Unavailable`] rather
/// than as empty results.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the matching documents in insertion order.
    async fn find(
        &self,
        collection: &str,
        filter: Filter<'_>,
    ) -> Result<Vec<StoredDocument>, StorageError>;

    /// Stores a new document and returns the generated identifier.
    async fn insert(&self, collection: &str, body: Document) -> Result<String, StorageError>;

    /// Merges `body` into the document with identifier `id`.
    ///
    /// Fields absent from `body` keep their stored values. Returns `None`
    /// when no such document exists; nothing is inserted in that case.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> Result<Option<String>, StorageError>;

    /// Merges `body` into the first document whose `key` equals `value`,
    /// inserting it when none matches. Returns the affected identifier.
    async fn upsert_by_field(
        &self,
        collection: &str,
        key: &str,
        value: &Value,
        body: Document,
    ) -> Result<String, StorageError>;

    /// Removes at most one matching document. Returns whether one was removed.
    async fn delete_one(&self, collection: &str, filter: Filter<'_>)
    -> Result<bool, StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Returns the backend name, used in logs and readiness output.
    fn backend_name(&self) -> &'static str;
}
