use serde::Serialize;
use thiserror::Error;

/// A problem with one form field, as shown next to the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Same error under a prefixed field name, for nested forms.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self {
            field: format!("{}{}", prefix, self.field),
            message: self.message,
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("{}", join(.0))]
    Incomplete(Vec<FieldError>),
}

impl FormError {
    /// Field errors carried by this error, if any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            FormError::Incomplete(errors) => errors,
            FormError::UnknownField(_) => &[],
        }
    }
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
