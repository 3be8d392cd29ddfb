//! Token verification, token issuance and credential exchange.

use std::sync::Arc;

use wimo_core::{Permission, RoleGroup, Token, log_prefix};
use wimo_storage::Persistence;

use crate::cache::TokenCache;
use crate::error::{AuthError, AuthResult, UNAUTHORIZED_ACCESS, UNAUTHORIZED_USER_LEVEL};
use crate::repository::{TokenRepository, UserRepository};

/// Outcome of exchanging a username and password for a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    /// Username or password was empty.
    MissingCredentials,
    /// No user with that username exists.
    UnknownUser,
    /// The password did not match.
    WrongPassword,
    /// The credentials matched; carries the user's token.
    Authenticated(Token),
}

impl CredentialCheck {
    /// Human-readable message for the response envelope.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Please send basic authentication",
            Self::UnknownUser => "User not found",
            Self::WrongPassword => "Wrong password",
            Self::Authenticated(_) => "User authenticated, returning token",
        }
    }
}

/// The caller behind a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub role: RoleGroup,
}

/// Verifies bearer tokens and issues new ones.
///
/// Owns the token cache; clones share it.
#[derive(Debug, Clone)]
pub struct Authenticator {
    users: UserRepository,
    tokens: TokenRepository,
    cache: Arc<TokenCache>,
}

impl Authenticator {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self::with_cache(persistence, Arc::new(TokenCache::new()))
    }

    #[must_use]
    pub fn with_cache(persistence: Persistence, cache: Arc<TokenCache>) -> Self {
        Self {
            users: UserRepository::new(persistence.clone()),
            tokens: TokenRepository::new(persistence),
            cache,
        }
    }

    #[must_use]
    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenRepository {
        &self.tokens
    }

    #[must_use]
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Returns whether `token` is a known token.
    ///
    /// A cache hit needs no backend access. On a miss the whole cache is
    /// reloaded from the backend and checked once more.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the reload fails; the previous cache
    /// contents stay in place.
    pub async fn verify(&self, token: &str) -> AuthResult<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        if self.cache.contains(token) {
            tracing::trace!(token = %log_prefix(token), "Token found in cache");
            return Ok(true);
        }

        tracing::debug!(token = %log_prefix(token), "Token cache miss, reloading");
        let fresh = self.cache.snapshot().reload(&self.tokens).await?;
        let found = fresh.contains(token);
        tracing::debug!(
            tokens = fresh.len(),
            generation = fresh.generation(),
            "Token cache reloaded"
        );
        self.cache.replace(fresh);
        Ok(found)
    }

    /// Returns the token of `username`, creating and storing one if needed.
    ///
    /// The token is added to the cache so it verifies immediately.
    pub async fn issue(&self, username: &str) -> AuthResult<Token> {
        if let Some(existing) = self.tokens.get_by_username(username).await? {
            self.cache.insert(&existing.token);
            return Ok(existing);
        }

        let mut token = Token::generate(username);
        token.id = self.tokens.save(&token).await?;
        self.cache.insert(&token.token);
        tracing::info!(username, token = %token.log_prefix(), "Issued new token");
        Ok(token)
    }

    /// Exchanges a username and password for the user's token.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<CredentialCheck> {
        if username.is_empty() || password.is_empty() {
            tracing::info!("Basic authentication with empty username or password");
            return Ok(CredentialCheck::MissingCredentials);
        }

        let Some(user) = self.users.get_by_username(username).await? else {
            tracing::info!(username, "User not found");
            return Ok(CredentialCheck::UnknownUser);
        };

        if !user.verify_password(password) {
            tracing::info!(username, "Wrong password");
            return Ok(CredentialCheck::WrongPassword);
        }

        let token = self.issue(&user.username).await?;
        Ok(CredentialCheck::Authenticated(token))
    }

    /// Resolves the owner of a verified `token`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` if the token is unknown, `Forbidden` if its owner
    /// does not exist or has no known role group.
    pub async fn principal(&self, token: &str) -> AuthResult<Principal> {
        if !self.verify(token).await? {
            return Err(AuthError::unauthorized(UNAUTHORIZED_ACCESS));
        }

        let username = self
            .tokens
            .get_username_by_token(token)
            .await?
            .ok_or_else(|| AuthError::unauthorized(UNAUTHORIZED_ACCESS))?;

        let user = self
            .users
            .get_by_username(&username)
            .await?
            .ok_or_else(|| {
                tracing::warn!(username = %username, "Token owner does not exist");
                AuthError::forbidden(UNAUTHORIZED_USER_LEVEL)
            })?;

        let role = user.role().ok_or_else(|| {
            tracing::warn!(
                username = %username,
                role_group = %user.role_group,
                "Role group not in permission table"
            );
            AuthError::forbidden(UNAUTHORIZED_USER_LEVEL)
        })?;

        Ok(Principal { username, role })
    }

    /// Verifies `token` and checks that its owner may perform `permission`.
    pub async fn authorize(&self, token: &str, permission: Permission) -> AuthResult<Principal> {
        let principal = self.principal(token).await?;
        if !principal.role.permits(permission) {
            tracing::info!(
                username = %principal.username,
                role = %principal.role,
                permission = %permission,
                "Permission denied"
            );
            return Err(AuthError::forbidden(UNAUTHORIZED_USER_LEVEL));
        }
        Ok(principal)
    }
}
