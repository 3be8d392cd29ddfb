//! # wimo-core
//!
//! Entity types shared by every layer of the WiMo gateway.
//!
//! The crate defines the two persisted entities ([`User`] and [`Token`]),
//! the closed-world [`Schema`] each of them is validated against, and the
//! fixed role-group permission table used at the request boundary.
//!
//! Adoption of untyped key/value data always goes through
//! [`Entity::adopt`], which rejects unknown fields, missing required
//! fields and mistyped values before any typed value is produced:
//!
//! ```ignore
//! use wimo_core::{Entity, User};
//!
//! let data = serde_json::json!({
//!     "fname": "a", "pname": "b", "age": 4,
//!     "username": "user", "password": "", "role_group": "readonly"
//! });
//! let user = User::adopt(data.as_object().unwrap())?;
//! ```

mod entity;
mod error;
mod role;
pub mod schema;
mod token;
mod user;

pub use entity::{Entity, ID_FIELD};
pub use error::{ValidationError, ValidationErrors, ValidationProblem};
pub use role::{Permission, RoleGroup, UnknownRoleGroup};
pub use schema::{FieldKind, FieldSpec, Schema};
pub use token::{TOKEN_RANDOM_HEX_LEN, Token, log_prefix};
pub use user::User;

/// Untyped document representation exchanged with the persistence layer.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Result alias for validator operations.
pub type ValidationResult<T> = Result<T, ValidationErrors>;
