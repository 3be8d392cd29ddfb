//! Validation error types.

use std::fmt;

use serde::Serialize;

/// What is wrong with a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationProblem {
    /// The field is not declared by the entity schema.
    UnknownField,
    /// A required field is absent.
    MissingField,
    /// The value does not have the declared primitive type.
    WrongType {
        /// Declared type name.
        expected: &'static str,
    },
    /// The payload could not be converted after passing the schema check.
    Malformed {
        /// Conversion failure description.
        message: String,
    },
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField => write!(f, "unknown field"),
            Self::MissingField => write!(f, "missing required field"),
            Self::WrongType { expected } => write!(f, "expected {expected}"),
            Self::Malformed { message } => write!(f, "{message}"),
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {problem}")]
pub struct ValidationError {
    /// Name of the offending field. Empty for whole-document failures.
    pub field: String,
    /// The failure.
    #[serde(flatten)]
    pub problem: ValidationProblem,
}

impl ValidationError {
    #[must_use]
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: ValidationProblem::UnknownField,
        }
    }

    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: ValidationProblem::MissingField,
        }
    }

    #[must_use]
    pub fn wrong_type(field: impl Into<String>, expected: &'static str) -> Self {
        Self {
            field: field.into(),
            problem: ValidationProblem::WrongType { expected },
        }
    }

    #[must_use]
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            problem: ValidationProblem::Malformed {
                message: message.into(),
            },
        }
    }
}

/// All field errors found while validating one document.
///
/// Never empty when returned as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    #[must_use]
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    #[must_use]
    pub fn single(error: ValidationError) -> Self {
        Self(vec![error])
    }

    /// Returns the individual field errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Returns `true` if any error concerns `field`.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Returns `true` if any error is an unknown field.
    #[must_use]
    pub fn has_unknown_field(&self) -> bool {
        self.0
            .iter()
            .any(|e| e.problem == ValidationProblem::UnknownField)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errs = ValidationErrors::new(vec![
            ValidationError::unknown_field("dummy"),
            ValidationError::wrong_type("password", "string"),
        ]);
        assert_eq!(
            errs.to_string(),
            "dummy: unknown field; password: expected string"
        );
    }

    #[test]
    fn test_error_predicates() {
        let errs = ValidationErrors::single(ValidationError::missing_field("username"));
        assert!(errs.has_field("username"));
        assert!(!errs.has_field("password"));
        assert!(!errs.has_unknown_field());
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn test_error_serialization() {
        let errs = ValidationErrors::single(ValidationError::wrong_type("age", "integer"));
        let json = serde_json::to_value(&errs).unwrap();
        assert_eq!(json[0]["field"], "age");
        assert_eq!(json[0]["kind"], "wrong_type");
        assert_eq!(json[0]["expected"], "integer");
    }
}
