//! Token entity and bearer token generation.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::entity::Entity;
use crate::schema::{FieldKind, FieldSpec, Schema};

/// Number of random hex characters at the start of a generated token.
pub const TOKEN_RANDOM_HEX_LEN: usize = 20;

const TOKEN_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional_nullable("id", FieldKind::String),
    FieldSpec::required("token", FieldKind::String),
    FieldSpec::required("username", FieldKind::String),
];

static TOKEN_SCHEMA: Schema = Schema::new(TOKEN_FIELDS);

/// An opaque bearer credential owned by a user.
///
/// The owning `username` is not checked against the user collection.
/// Tokens carry no expiry.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub id: Option<String>,
    pub token: String,
    pub username: String,
}

impl Token {
    #[must_use]
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: None,
            token: token.into(),
            username: username.into(),
        }
    }

    /// Generates a fresh token for `username`.
    ///
    /// The value is [`TOKEN_RANDOM_HEX_LEN`] random hex characters followed
    /// by the current unix timestamp in seconds.
    #[must_use]
    pub fn generate(username: impl Into<String>) -> Self {
        Self::new(generate_token_value(), username)
    }

    /// Short prefix safe to write to logs.
    #[must_use]
    pub fn log_prefix(&self) -> &str {
        log_prefix(&self.token)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("token", &format_args!("{}...", self.log_prefix()))
            .field("username", &self.username)
            .finish()
    }
}

impl Entity for Token {
    const COLLECTION: &'static str = "token";
    const NATURAL_KEY: Option<&'static str> = Some("username");

    fn schema() -> &'static Schema {
        &TOKEN_SCHEMA
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn generate_token_value() -> String {
    let mut bytes = [0u8; TOKEN_RANDOM_HEX_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    let timestamp = OffsetDateTime::now_utc().unix_timestamp();
    format!("{}{timestamp}", hex::encode(bytes))
}

/// Returns at most the first six characters of a token string.
#[must_use]
pub fn log_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(6)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_token_shape() {
        let token = Token::generate("alice");
        assert_eq!(token.username, "alice");
        assert!(token.id.is_none());
        let (random, timestamp) = token.token.split_at(TOKEN_RANDOM_HEX_LEN);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(timestamp.parse::<i64>().unwrap() > 1_500_000_000);
    }

    #[test]
    fn test_generated_tokens_differ() {
        let a = Token::generate("alice");
        let b = Token::generate("alice");
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_adopt_token() {
        let data = json!({"token": "1234", "username": "testuser"});
        let token = Token::adopt(data.as_object().unwrap()).unwrap();
        assert_eq!(token.token, "1234");

        let data = json!({"token": "1234", "username": 1});
        assert!(Token::adopt(data.as_object().unwrap()).is_err());

        let data = json!({"token": "1234", "username": "testuser", "wrong_attribute": false});
        let err = Token::adopt(data.as_object().unwrap()).unwrap_err();
        assert!(err.has_unknown_field());
    }

    #[test]
    fn test_empty_token_is_valid() {
        let document = Token::default().to_document();
        assert!(Token::validate(&document).is_ok());
    }

    #[test]
    fn test_debug_hides_token() {
        let token = Token::new("873f7688bbe4086ab27a1544122563", "admin");
        let debug = format!("{token:?}");
        assert!(debug.contains("873f76..."));
        assert!(!debug.contains("873f7688bbe4"));
    }

    #[test]
    fn test_log_prefix_short_token() {
        assert_eq!(log_prefix("abc"), "abc");
        assert_eq!(log_prefix(""), "");
    }
}
