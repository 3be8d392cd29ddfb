//! In-memory document store backend for the WiMo gateway.
//!
//! This crate provides an implementation of the `DocumentStore` trait from
//! `wimo-storage`, using a papaya lock-free HashMap for concurrent access.
//! Contents live for the lifetime of the process.
//!
//! # Example
//!
//! ```ignore
//! use wimo_db_memory::create_store;
//! use wimo_storage::Persistence;
//!
//! let persistence = Persistence::new(create_store());
//! let id = persistence.save("token", Some("username"), &document).await?;
//! ```

pub mod storage;

pub use storage::{InMemoryStore, StorageKey};

/// Creates a new shareable in-memory store.
pub fn create_store() -> wimo_storage::DynDocumentStore {
    std::sync::Arc::new(InMemoryStore::new())
}
