//! Typed repositories over the persistence facade.
//!
//! Every write validates its input against the entity schema before it
//! reaches the backend. Documents read back are adopted through the same
//! validator; a stored document that no longer fits is reported as
//! `StorageError::InvalidDocument`.

use serde_json::Value;
use wimo_core::{Document, Entity, Token, User};
use wimo_storage::{Persistence, StorageError};

use crate::error::AuthResult;

fn adopt_stored<E: Entity>(document: &Document) -> AuthResult<E> {
    E::adopt(document).map_err(|errors| {
        StorageError::invalid_document(format!("Stored {} is invalid: {errors}", E::COLLECTION))
            .into()
    })
}

async fn save_entity<E: Entity>(
    persistence: &Persistence,
    entity: &E,
) -> AuthResult<Option<String>> {
    Ok(persistence
        .save(E::COLLECTION, E::NATURAL_KEY, &entity.to_document())
        .await?)
}

async fn find_one<E: Entity>(
    persistence: &Persistence,
    key: &str,
    value: &str,
) -> AuthResult<Option<E>> {
    let documents = persistence
        .load(E::COLLECTION, Some(key), Some(&Value::from(value)))
        .await?;
    documents.first().map(adopt_stored::<E>).transpose()
}

async fn find_all<E: Entity>(persistence: &Persistence) -> AuthResult<Vec<E>> {
    persistence
        .load(E::COLLECTION, None, None)
        .await?
        .iter()
        .map(adopt_stored::<E>)
        .collect()
}

/// Repository for [`User`] records.
#[derive(Debug, Clone)]
pub struct UserRepository {
    persistence: Persistence,
}

impl UserRepository {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    /// Validates untyped `data` and saves it.
    ///
    /// Returns the affected id, or `None` if `data` names an id that does
    /// not exist.
    pub async fn add(&self, data: &Document) -> AuthResult<Option<String>> {
        let user = User::adopt(data)?;
        self.save(&user).await
    }

    pub async fn save(&self, user: &User) -> AuthResult<Option<String>> {
        tracing::debug!(username = %user.username, "Saving user");
        save_entity(&self.persistence, user).await
    }

    pub async fn get_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        find_one(&self.persistence, "username", username).await
    }

    /// All users in insertion order.
    pub async fn list(&self) -> AuthResult<Vec<User>> {
        find_all(&self.persistence).await
    }

    /// Deletes the user with identifier `id`.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn delete(&self, id: &str) -> AuthResult<bool> {
        Ok(self
            .persistence
            .delete(User::COLLECTION, wimo_core::ID_FIELD, &Value::from(id))
            .await?)
    }
}

/// Repository for [`Token`] records.
#[derive(Debug, Clone)]
pub struct TokenRepository {
    persistence: Persistence,
}

impl TokenRepository {
    #[must_use]
    pub fn new(persistence: Persistence) -> Self {
        Self { persistence }
    }

    /// Validates untyped `data` and saves it.
    pub async fn add(&self, data: &Document) -> AuthResult<Option<String>> {
        let token = Token::adopt(data)?;
        self.save(&token).await
    }

    pub async fn save(&self, token: &Token) -> AuthResult<Option<String>> {
        tracing::debug!(username = %token.username, token = %token.log_prefix(), "Saving token");
        save_entity(&self.persistence, token).await
    }

    pub async fn get_by_username(&self, username: &str) -> AuthResult<Option<Token>> {
        find_one(&self.persistence, "username", username).await
    }

    /// Returns the owner of `token`, if the token is known.
    pub async fn get_username_by_token(&self, token: &str) -> AuthResult<Option<String>> {
        let found: Option<Token> = find_one(&self.persistence, "token", token).await?;
        Ok(found.map(|t| t.username))
    }

    /// All tokens in insertion order.
    pub async fn list(&self) -> AuthResult<Vec<Token>> {
        find_all(&self.persistence).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wimo_db_memory::create_store;

    fn persistence() -> Persistence {
        Persistence::new(create_store())
    }

    fn user_data() -> Document {
        json!({
            "fname": "a",
            "pname": "b",
            "age": 4,
            "username": "user",
            "password": "",
            "role_group": "aa"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[tokio::test]
    async fn test_user_add_get_delete() {
        let users = UserRepository::new(persistence());

        let id = users.add(&user_data()).await.unwrap().unwrap();
        let user = users.get_by_username("user").await.unwrap().unwrap();
        assert_eq!(user.id.as_deref(), Some(id.as_str()));
        assert_eq!(user.age, 4);
        assert_eq!(user.role_group, "aa");

        assert!(users.delete(&id).await.unwrap());
        assert!(!users.delete(&id).await.unwrap());
        assert!(users.get_by_username("user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_add_rejects_unknown_field() {
        let users = UserRepository::new(persistence());
        let mut data = user_data();
        data.insert("dummy".into(), json!("x"));

        let err = users.add(&data).await.unwrap_err();
        match err {
            crate::AuthError::Validation(errors) => assert!(errors.has_field("dummy")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(users.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_user_add_with_unknown_id_returns_none() {
        let users = UserRepository::new(persistence());
        let mut data = user_data();
        data.insert("id".into(), json!("missing"));

        assert_eq!(users.add(&data).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_user_list_in_insertion_order() {
        let users = UserRepository::new(persistence());
        for name in ["admin", "readonly", "guest"] {
            users
                .save(&User::new(name, "1234", "readonly"))
                .await
                .unwrap();
        }
        let names: Vec<_> = users
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["admin", "readonly", "guest"]);
    }

    #[tokio::test]
    async fn test_token_lookups() {
        let tokens = TokenRepository::new(persistence());
        tokens
            .save(&Token::new("873f7688bbe4086ab27a1544122563", "admin"))
            .await
            .unwrap();

        let token = tokens.get_by_username("admin").await.unwrap().unwrap();
        assert_eq!(token.token, "873f7688bbe4086ab27a1544122563");
        assert_eq!(
            tokens
                .get_username_by_token("873f7688bbe4086ab27a1544122563")
                .await
                .unwrap()
                .as_deref(),
            Some("admin")
        );
        assert!(tokens.get_username_by_token("nope").await.unwrap().is_none());
        assert_eq!(tokens.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_token_add_validates() {
        let tokens = TokenRepository::new(persistence());
        let data = json!({"token": "1234", "username": 1});
        let err = tokens
            .add(data.as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_stored_document_reported() {
        let persistence = persistence();
        persistence
            .save("user", None, json!({"username": "broken"}).as_object().unwrap())
            .await
            .unwrap();

        let users = UserRepository::new(persistence);
        let err = users.get_by_username("broken").await.unwrap_err();
        assert!(matches!(
            err,
            crate::AuthError::Storage(StorageError::InvalidDocument { .. })
        ));
    }
}
