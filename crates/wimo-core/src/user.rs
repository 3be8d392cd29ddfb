//! User entity.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::role::RoleGroup;
use crate::schema::{FieldKind, FieldSpec, Schema};

const USER_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional_nullable("id", FieldKind::String),
    FieldSpec::required("fname", FieldKind::String),
    FieldSpec::required("pname", FieldKind::String),
    FieldSpec::required("age", FieldKind::NonNegativeInteger),
    FieldSpec::required("username", FieldKind::String),
    FieldSpec::required("password", FieldKind::String),
    FieldSpec::required("role_group", FieldKind::String),
];

static USER_SCHEMA: Schema = Schema::new(USER_FIELDS);

/// A user of the gateway.
///
/// `username` is the natural key. `password` is a shared secret stored as
/// given; it is compared verbatim by [`User::verify_password`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend identifier, `None` until the user is stored.
    #[serde(default)]
    pub id: Option<String>,
    /// Full name.
    pub fname: String,
    /// Preferred name.
    pub pname: String,
    pub age: u32,
    pub username: String,
    pub password: String,
    /// Raw role group name. Only names known to [`RoleGroup`] grant access.
    pub role_group: String,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: None,
            fname: String::new(),
            pname: String::new(),
            age: 0,
            username: String::new(),
            password: String::new(),
            role_group: RoleGroup::Readonly.as_str().to_string(),
        }
    }
}

impl User {
    /// Creates a user with the given credentials and role group.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        role_group: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role_group: role_group.into(),
            ..Default::default()
        }
    }

    /// Checks a presented password against the stored one.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        self.password == password
    }

    /// The parsed role group, `None` if the stored name is not in the
    /// permission table.
    #[must_use]
    pub fn role(&self) -> Option<RoleGroup> {
        self.role_group.parse().ok()
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "user";
    const NATURAL_KEY: Option<&'static str> = Some("username");

    fn schema() -> &'static Schema {
        &USER_SCHEMA
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_adopt_valid_user() {
        let user = User::adopt(&doc(json!({
            "fname": "a", "pname": "b", "age": 4,
            "username": "user", "password": "", "role_group": "aa"
        })))
        .unwrap();
        assert_eq!(user.username, "user");
        assert_eq!(user.age, 4);
        assert_eq!(user.id, None);
        assert_eq!(user.role(), None);
    }

    #[test]
    fn test_adopt_rejects_extra_field() {
        let err = User::adopt(&doc(json!({
            "id": null, "fnam": "", "pname": "", "age": 99,
            "username": "", "password": "", "dummy": "raises exception"
        })))
        .unwrap_err();
        assert!(err.has_field("dummy"));
        assert!(err.has_field("fnam"));
        assert!(err.has_field("fname"));
        assert!(err.has_field("role_group"));
    }

    #[test]
    fn test_adopt_rejects_mistyped_password() {
        let err = User::adopt(&doc(json!({
            "id": null, "fname": "", "pname": "", "age": 99,
            "username": "", "password": 123, "role_group": "readonly"
        })))
        .unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.has_field("password"));
    }

    #[test]
    fn test_adopt_rejects_age_overflow() {
        let err = User::adopt(&doc(json!({
            "fname": "", "pname": "", "age": 5_000_000_000u64,
            "username": "u", "password": "p", "role_group": "readonly"
        })))
        .unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.has_field("age"));
        assert_eq!(
            err.errors()[0].problem,
            crate::ValidationProblem::WrongType {
                expected: "non-negative integer"
            }
        );
    }

    #[test]
    fn test_document_round_trip() {
        let mut user = User::new("alice", "secret", "administrator");
        user.id = Some("abc".into());
        let document = user.to_document();
        assert_eq!(document["id"], "abc");
        assert_eq!(document.len(), 7);
        assert_eq!(User::adopt(&document).unwrap(), user);
    }

    #[test]
    fn test_unset_id_serializes_as_null() {
        let document = User::default().to_document();
        assert_eq!(document["id"], serde_json::Value::Null);
        assert_eq!(document["role_group"], "readonly");
    }

    #[test]
    fn test_verify_password() {
        let user = User::new("alice", "1234", "readonly");
        assert!(user.verify_password("1234"));
        assert!(!user.verify_password("12345"));
        assert_eq!(user.role(), Some(RoleGroup::Readonly));
    }
}
