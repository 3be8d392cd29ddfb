//! The [`Entity`] trait implemented by every persisted record type.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ValidationError, ValidationErrors};
use crate::schema::Schema;
use crate::{Document, ValidationResult};

/// Neutral identifier field name seen by every caller of the persistence layer.
pub const ID_FIELD: &str = "id";

/// A named record type with a fixed schema.
pub trait Entity: Serialize + DeserializeOwned + Sized {
    /// Collection (table) name in the backend.
    const COLLECTION: &'static str;

    /// Business key used for upserts when no identifier is supplied.
    const NATURAL_KEY: Option<&'static str>;

    /// The closed-world field set of this entity.
    fn schema() -> &'static Schema;

    /// Identifier assigned by the backend, if any.
    fn id(&self) -> Option<&str>;

    /// Checks untyped data against [`Entity::schema`] without converting it.
    ///
    /// # Errors
    ///
    /// Returns the collected field errors.
    fn validate(data: &Document) -> ValidationResult<()> {
        Self::schema().validate(data)
    }

    /// Validates `data` and builds a populated entity from it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] for unknown fields, missing required
    /// fields or values of the wrong type.
    fn adopt(data: &Document) -> ValidationResult<Self> {
        Self::validate(data)?;
        serde_json::from_value(Value::Object(data.clone())).map_err(|e| {
            ValidationErrors::single(ValidationError::malformed(String::new(), e.to_string()))
        })
    }

    /// Converts the entity into its untyped document form.
    ///
    /// The identifier is always present, as `null` when unset.
    fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Document::new(),
        }
    }
}
