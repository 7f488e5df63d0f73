//! # Validation Module
//!
//! Field errors reported by [`Validate`] after a body has been decoded.
//!
//! Types decoded by `Context::bind_json` implement [`Validate`]; the default
//! method accepts everything, so `impl Validate for MyBody {}` opts in.
//! Rejections are answered with status 400 and a body of the form
//! `{"errors":[{"field":..,"message":..,"code":..}]}`.

use serde::Serialize;
use std::collections::HashMap;

/// Why a field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Missing or empty
    Required,
    /// Present but malformed
    InvalidFormat,
    /// Numeric or length bound violated
    OutOfRange,
    /// Anything else
    Custom,
}

/// One rejected field
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `items[2].name`
    pub field: String,
    /// Human-readable message
    pub message: String,
    /// Machine-readable code
    pub code: ValidationCode,
}

impl FieldError {
    /// Error for `field` with an explicit message and code
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code,
        }
    }

    /// "`field` is required"
    pub fn required(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("{field} is required"),
            field,
            code: ValidationCode::Required,
        }
    }
}

/// Every field error found in one body
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    /// Errors in the order they were found
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// No errors yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `error`
    pub fn add(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Record a missing `field`
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(FieldError::required(field));
    }

    /// Record the errors of a nested value under `prefix`
    pub fn nest(&mut self, prefix: &str, nested: Self) {
        for mut e in nested.errors {
            e.field = format!("{prefix}.{}", e.field);
            self.add(e);
        }
    }

    /// True when nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded errors
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`
    ///
    /// # Errors
    ///
    /// Returns `self` if any error was recorded.
    pub fn into_result(self) -> ValidationResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// The 400 response body as a string
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"errors":[]}"#.to_string())
    }
}

/// Outcome of [`Validate::validate`]
pub type ValidationResult<T> = std::result::Result<T, ValidationErrors>;

/// Post-decode checks for a bound request body
pub trait Validate {
    /// Check the decoded value
    ///
    /// # Errors
    ///
    /// Returns every field that failed.
    fn validate(&self) -> ValidationResult<()> {
        Ok(())
    }
}

impl Validate for serde_json::Value {}

impl<V> Validate for HashMap<String, V> {}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = ValidationErrors::new();
        for (i, item) in self.iter().enumerate() {
            if let Err(item_errors) = item.validate() {
                errors.nest(&format!("[{i}]"), item_errors);
            }
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Signup {
        email: String,
        age: u32,
    }

    impl Validate for Signup {
        fn validate(&self) -> ValidationResult<()> {
            let mut errors = ValidationErrors::new();
            if self.email.is_empty() {
                errors.add_required("email");
            } else if !self.email.contains('@') {
                errors.add(FieldError::new(
                    "email",
                    "email must contain @",
                    ValidationCode::InvalidFormat,
                ));
            }
            if self.age > 150 {
                errors.add(FieldError::new("age", "age must be at most 150", ValidationCode::OutOfRange));
            }
            errors.into_result()
        }
    }

    fn signup(email: &str, age: u32) -> Signup {
        Signup {
            email: email.to_string(),
            age,
        }
    }

    #[test]
    fn test_required_message() {
        let error = FieldError::required("email");
        assert_eq!(error.field, "email");
        assert_eq!(error.code, ValidationCode::Required);
        assert_eq!(error.message, "email is required");
    }

    #[test]
    fn test_collects_every_field() {
        assert!(signup("a@b.c", 30).validate().is_ok());

        let errors = signup("nope", 200).validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.errors[0].code, ValidationCode::InvalidFormat);
        assert_eq!(errors.errors[1].field, "age");
    }

    #[test]
    fn test_response_body_shape() {
        let errors = signup("", 1).validate().unwrap_err();
        assert_eq!(
            errors.to_json(),
            r#"{"errors":[{"field":"email","message":"email is required","code":"REQUIRED"}]}"#
        );
    }

    #[test]
    fn test_validate_default_accepts() {
        assert!(serde_json::json!({"any": 1}).validate().is_ok());
    }

    #[test]
    fn test_validate_vec_prefixes_index() {
        let items = vec![signup("a@b.c", 1), signup("", 1)];
        let errors = items.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors[0].field, "[1].email");
    }
}
