//! Process-wide cache of known bearer token strings.
//!
//! The cache holds an immutable [`TokenSnapshot`] behind an `ArcSwap`, so
//! lookups are a single atomic load and never wait for a reload. A reload
//! builds a complete new snapshot from the token repository and swaps it in.
//! Two requests missing at the same time may both reload; the last swap wins
//! and both snapshots are equally fresh.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::AuthResult;
use crate::repository::TokenRepository;

/// Lifecycle of the cache.
///
/// `Empty` until the first successful load, `Populated` afterwards for the
/// rest of the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Populated,
}

/// An immutable set of token strings.
#[derive(Debug, Clone, Default)]
pub struct TokenSnapshot {
    tokens: HashSet<String>,
    populated: bool,
    generation: u64,
}

impl TokenSnapshot {
    /// The initial, never-loaded snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the successor of `self` holding exactly `tokens`.
    #[must_use]
    pub fn replaced_with(&self, tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            populated: true,
            generation: self.generation + 1,
        }
    }

    /// Builds the successor of `self` with `token` added.
    #[must_use]
    pub fn with_token(&self, token: &str) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.insert(token.to_string());
        Self {
            tokens,
            populated: self.populated,
            generation: self.generation + 1,
        }
    }

    /// Loads every token from `repository` into a new snapshot.
    ///
    /// `self` is left untouched, so a failed reload keeps the previous
    /// contents in service.
    pub async fn reload(&self, repository: &TokenRepository) -> AuthResult<Self> {
        let tokens = repository.list().await?;
        Ok(self.replaced_with(tokens.into_iter().map(|t| t.token)))
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        if self.populated {
            CacheState::Populated
        } else {
            CacheState::Empty
        }
    }

    /// Number of snapshots that preceded this one.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Shared holder of the current [`TokenSnapshot`].
#[derive(Debug)]
pub struct TokenCache {
    current: ArcSwap<TokenSnapshot>,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(TokenSnapshot::empty()),
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TokenSnapshot> {
        self.current.load_full()
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.current.load().contains(token)
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        self.current.load().state()
    }

    /// Swaps in `snapshot`.
    pub fn replace(&self, snapshot: TokenSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Adds a single token without touching the backend.
    pub fn insert(&self, token: &str) {
        self.current
            .rcu(|current| Arc::new(current.with_token(token)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wimo_core::Token;
    use wimo_db_memory::create_store;
    use wimo_storage::Persistence;

    #[test]
    fn test_new_cache_is_empty() {
        let cache = TokenCache::new();
        assert_eq!(cache.state(), CacheState::Empty);
        assert!(!cache.contains("anything"));
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn test_insert_keeps_state() {
        let cache = TokenCache::new();
        cache.insert("abc");
        assert!(cache.contains("abc"));
        assert_eq!(cache.state(), CacheState::Empty);
        assert_eq!(cache.snapshot().generation(), 1);
    }

    #[test]
    fn test_replaced_with_drops_old_tokens() {
        let old = TokenSnapshot::empty().with_token("gone");
        let new = old.replaced_with(vec!["kept".to_string()]);
        assert!(!new.contains("gone"));
        assert!(new.contains("kept"));
        assert_eq!(new.state(), CacheState::Populated);
        assert_eq!(new.generation(), old.generation() + 1);
        assert!(old.contains("gone"));
    }

    #[tokio::test]
    async fn test_reload_from_repository() {
        let repository = TokenRepository::new(Persistence::new(create_store()));
        repository
            .save(&Token::new("873f7688bbe4086ab27a1544122563", "admin"))
            .await
            .unwrap();
        repository
            .save(&Token::new("4c078c9db4a85c59f1fd1544122586", "readonly"))
            .await
            .unwrap();

        let snapshot = TokenSnapshot::empty().reload(&repository).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains("873f7688bbe4086ab27a1544122563"));
        assert_eq!(snapshot.state(), CacheState::Populated);
    }

    #[tokio::test]
    async fn test_reload_of_empty_backend_populates() {
        let repository = TokenRepository::new(Persistence::new(create_store()));
        let snapshot = TokenSnapshot::empty().reload(&repository).await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.state(), CacheState::Populated);
    }
}
