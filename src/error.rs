// Error types shared by the handler layer and the HTTP surface

use thiserror::Error;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Errors a handler can return.
///
/// "Not found" for the *target* entity of a get/update/delete is not an
/// error: those handlers return `Ok(None)` / `Ok(false)`. `NotFound` is
/// reserved for a missing *referenced* entity (e.g. a gift pointing at an
/// important date that does not exist).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    #[error("route id {route} does not match body id {body}")]
    IdMismatch { route: Uuid, body: Uuid },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Single-field validation failure
    pub fn invalid(context: &str, field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }])
    }

    /// A derived total or ratio that does not fit a decimal
    pub fn out_of_range(context: &str, field: &str) -> Self {
        AppError::invalid(context, field, "Result is out of range")
    }
}

impl From<Vec<ValidationError>> for AppError {
    fn from(errors: Vec<ValidationError>) -> Self {
        AppError::Validation(errors)
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type AppResult<T> = Result<T, AppError>;

/// Configuration errors, reported with the offending key.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = AppError::Validation(vec![
            ValidationError {
                field: "name".to_string(),
                message: "Required field is empty".to_string(),
                context: "Wine".to_string(),
            },
            ValidationError {
                field: "bottle_count".to_string(),
                message: "Must be at least 0".to_string(),
                context: "Wine".to_string(),
            },
        ]);

        let text = err.to_string();
        assert!(text.contains("[Wine] name"));
        assert!(text.contains("[Wine] bottle_count"));
    }

    #[test]
    fn test_not_found_names_kind() {
        let id = Uuid::new_v4();
        let err = AppError::NotFound { kind: "vehicle", id };
        assert_eq!(err.to_string(), format!("vehicle not found: {}", id));
    }
}
