//! Closed-world entity schemas.
//!
//! A [`Schema`] lists every field an entity may carry. Validation collects
//! all problems in one pass instead of stopping at the first one, so a
//! caller can report every offending field back to the client.

use serde_json::Value;

use crate::error::{ValidationError, ValidationErrors};
use crate::{Document, ValidationResult};

/// Primitive type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    String,
    /// JSON integer from zero up to `u32::MAX`.
    NonNegativeInteger,
}

impl FieldKind {
    /// Name used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::NonNegativeInteger => "non-negative integer",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::NonNegativeInteger => value
                .as_u64()
                .is_some_and(|n| u32::try_from(n).is_ok()),
        }
    }
}

/// Declaration of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// Whether an explicit `null` is accepted.
    pub nullable: bool,
}

impl FieldSpec {
    #[must_use]
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nullable: false,
        }
    }

    #[must_use]
    pub const fn optional_nullable(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: true,
        }
    }
}

/// The complete field set of an entity.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    fields: &'static [FieldSpec],
}

impl Schema {
    #[must_use]
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    #[must_use]
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Checks `data` against the schema.
    ///
    /// # Errors
    ///
    /// Returns every unknown field, missing required field and type mismatch.
    pub fn validate(&self, data: &Document) -> ValidationResult<()> {
        let mut errors = Vec::new();

        for key in data.keys() {
            if self.field(key).is_none() {
                errors.push(ValidationError::unknown_field(key.as_str()));
            }
        }

        for spec in self.fields {
            match data.get(spec.name) {
                None if spec.required => errors.push(ValidationError::missing_field(spec.name)),
                None => {}
                Some(Value::Null) if spec.nullable => {}
                Some(value) if spec.kind.matches(value) => {}
                Some(_) => errors.push(ValidationError::wrong_type(spec.name, spec.kind.name())),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::new(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationProblem;
    use serde_json::json;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::optional_nullable("id", FieldKind::String),
        FieldSpec::required("name", FieldKind::String),
        FieldSpec::required("count", FieldKind::NonNegativeInteger),
    ];
    const SCHEMA: Schema = Schema::new(FIELDS);

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_document() {
        assert!(SCHEMA.validate(&doc(json!({"name": "a", "count": 1}))).is_ok());
        assert!(
            SCHEMA
                .validate(&doc(json!({"id": null, "name": "a", "count": 0})))
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SCHEMA
            .validate(&doc(json!({"name": "a", "count": 1, "extra": true})))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.has_unknown_field());
        assert!(err.has_field("extra"));
    }

    #[test]
    fn test_missing_and_mistyped_collected_together() {
        let err = SCHEMA.validate(&doc(json!({"count": "1"}))).unwrap_err();
        assert!(err.has_field("name"));
        assert!(err.has_field("count"));
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn test_negative_integer_rejected() {
        let err = SCHEMA
            .validate(&doc(json!({"name": "a", "count": -3})))
            .unwrap_err();
        assert_eq!(
            err.errors()[0].problem,
            ValidationProblem::WrongType {
                expected: "non-negative integer"
            }
        );
    }

    #[test]
    fn test_integer_above_u32_rejected() {
        assert!(
            SCHEMA
                .validate(&doc(json!({"name": "a", "count": u32::MAX})))
                .is_ok()
        );

        let err = SCHEMA
            .validate(&doc(json!({"name": "a", "count": 5_000_000_000u64})))
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err.has_field("count"));
    }

    #[test]
    fn test_null_on_non_nullable_field() {
        let err = SCHEMA
            .validate(&doc(json!({"name": null, "count": 1})))
            .unwrap_err();
        assert!(err.has_field("name"));
    }
}
