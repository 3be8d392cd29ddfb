//! Backend-agnostic persistence facade.
//!
//! Every caller above this layer talks to [`Persistence`] with plain
//! key/value documents carrying a neutral `id` field. The facade translates
//! that field to and from the backend identifier, picks the save strategy,
//! and applies the [`CallPolicy`] to each backend call.

use serde_json::Value;
use wimo_core::{Document, ID_FIELD};

use crate::error::StorageError;
use crate::policy::CallPolicy;
use crate::traits::{DocumentStore, Filter, StoredDocument};
use crate::{DynDocumentStore, StorageResult};

/// Load/save/delete over a single configured backend.
#[derive(Clone)]
pub struct Persistence {
    store: DynDocumentStore,
    policy: CallPolicy,
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("backend", &self.store.backend_name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Persistence {
    /// Creates a facade with the default call policy.
    #[must_use]
    pub fn new(store: DynDocumentStore) -> Self {
        Self::with_policy(store, CallPolicy::default())
    }

    #[must_use]
    pub fn with_policy(store: DynDocumentStore, policy: CallPolicy) -> Self {
        Self { store, policy }
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    #[must_use]
    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    /// Returns the documents of `entity` matching `key == value`, or all of
    /// them when both are absent. A JSON `null` value counts as absent.
    ///
    /// Each returned document carries its identifier under `id`. An empty
    /// result means nothing matched; backend failures are errors.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidArguments` if exactly one of `key` and
    /// `value` is given.
    pub async fn load(
        &self,
        entity: &str,
        key: Option<&str>,
        value: Option<&Value>,
    ) -> StorageResult<Vec<Document>> {
        let value = value.filter(|v| !v.is_null());
        let filter = match (key, value) {
            (None, None) => Filter::All,
            (Some(key), Some(value)) => match field_filter(key, value) {
                Some(filter) => filter,
                None => return Ok(Vec::new()),
            },
            (Some(key), None) => {
                return Err(StorageError::invalid_arguments(format!(
                    "Key '{key}' given without a value"
                )));
            }
            (None, Some(_)) => {
                return Err(StorageError::invalid_arguments(
                    "Value given without a key",
                ));
            }
        };

        tracing::debug!(entity, key, backend = self.backend_name(), "Loading documents");

        let found = self
            .policy
            .call_with_retry("load", || self.store.find(entity, filter))
            .await?;

        Ok(found.into_iter().map(into_neutral).collect())
    }

    /// Persists `model` into `entity` and returns the affected identifier.
    ///
    /// - a non-null `id` updates that document by merging fields, returning
    ///   `None` if it does not exist. The update is refused when it sets
    ///   `natural_key` to a value another document already holds;
    /// - otherwise a non-null value under `natural_key` upserts on that field;
    /// - otherwise the model is inserted with a generated identifier.
    ///
    /// Writes are not retried.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidArguments` if `id` is neither a string
    /// nor null, or if an update would duplicate a natural key.
    pub async fn save(
        &self,
        entity: &str,
        natural_key: Option<&str>,
        model: &Document,
    ) -> StorageResult<Option<String>> {
        let mut body = model.clone();
        let id = body.remove(ID_FIELD);

        match id {
            Some(Value::String(id)) => {
                if let Some(key) = natural_key {
                    self.ensure_key_not_taken(entity, key, &id, &body).await?;
                }
                tracing::debug!(entity, id = %id, "Updating document by id");
                self.policy
                    .call("save", self.store.update_by_id(entity, &id, body))
                    .await
            }
            None | Some(Value::Null) => {
                let natural = natural_key
                    .and_then(|key| body.get(key).filter(|v| !v.is_null()).map(|v| (key, v.clone())));

                let id = match natural {
                    Some((key, value)) => {
                        tracing::debug!(entity, key, "Upserting document by natural key");
                        self.policy
                            .call("save", self.store.upsert_by_field(entity, key, &value, body))
                            .await?
                    }
                    None => {
                        tracing::debug!(entity, "Inserting document");
                        self.policy
                            .call("save", self.store.insert(entity, body))
                            .await?
                    }
                };
                Ok(Some(id))
            }
            Some(other) => Err(StorageError::invalid_arguments(format!(
                "Field '{ID_FIELD}' must be a string or null, got {other}"
            ))),
        }
    }

    /// Fails when a document other than `id` holds `body[key]`.
    async fn ensure_key_not_taken(
        &self,
        entity: &str,
        key: &str,
        id: &str,
        body: &Document,
    ) -> StorageResult<()> {
        let Some(value) = body.get(key).filter(|v| !v.is_null()) else {
            return Ok(());
        };
        let Some(filter) = field_filter(key, value) else {
            return Ok(());
        };

        let holders = self
            .policy
            .call_with_retry("save", || self.store.find(entity, filter))
            .await?;
        if holders.iter().any(|holder| holder.id != id) {
            tracing::info!(
                entity,
                key,
                id,
                "Rejected update to a natural key held by another document"
            );
            return Err(StorageError::invalid_arguments(format!(
                "Another {entity} already has this '{key}'"
            )));
        }
        Ok(())
    }

    /// Removes at most one document of `entity` where `key == value`.
    ///
    /// Returns `true` iff a document was removed.
    pub async fn delete(&self, entity: &str, key: &str, value: &Value) -> StorageResult<bool> {
        let Some(filter) = field_filter(key, value) else {
            return Ok(false);
        };

        tracing::debug!(entity, key, "Deleting document");

        self.policy
            .call("delete", self.store.delete_one(entity, filter))
            .await
    }

    /// Checks backend reachability.
    pub async fn ping(&self) -> StorageResult<()> {
        self.policy
            .call_with_retry("ping", || self.store.ping())
            .await
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }
}

/// Builds the backend filter for `key == value`.
///
/// A non-string `id` can never match a backend identifier, so `None` is
/// returned for it.
fn field_filter<'a>(key: &'a str, value: &'a Value) -> Option<Filter<'a>> {
    if key == ID_FIELD {
        value.as_str().map(Filter::Id)
    } else {
        Some(Filter::Field { key, value })
    }
}

fn into_neutral(stored: StoredDocument) -> Document {
    let mut document = stored.body;
    document.insert(ID_FIELD.to_string(), Value::String(stored.id));
    document
}
