//! # wimo-storage
//!
//! Persistence abstraction for the WiMo gateway.
//!
//! Backends implement [`DocumentStore`]; everything above this crate goes
//! through the [`Persistence`] facade, which exposes three operations over
//! untyped documents:
//!
//! - `load(entity, key, value)` returns matching documents,
//! - `save(entity, natural_key, model)` updates, upserts or inserts,
//! - `delete(entity, key, value)` removes at most one document.
//!
//! ## Example
//!
//! ```ignore
//! use wimo_storage::Persistence;
//!
//! async fn usernames(persistence: &Persistence) -> wimo_storage::StorageResult<Vec<String>> {
//!     let users = persistence.load("user", None, None).await?;
//!     Ok(users
//!         .iter()
//!         .filter_map(|u| u.get("username")?.as_str().map(str::to_string))
//!         .collect())
//! }
//! ```

mod error;
mod persistence;
mod policy;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use persistence::Persistence;
pub use policy::CallPolicy;
pub use traits::{DocumentStore, Filter, StoredDocument};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynDocumentStore = std::sync::Arc<dyn DocumentStore>;
