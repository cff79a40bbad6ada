//! Validation error types

use std::fmt;

/// Validation error for client input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Body is not a JSON object
    InvalidJson { reason: String },

    /// Required field absent or not of the expected type
    Missing { field: &'static str },

    /// Field is empty when it shouldn't be
    Empty { field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidJson { .. } => write!(f, "Invalid JSON"),
            Self::Missing { field } => write!(f, "Missing or invalid '{}' field", field),
            Self::Empty { field } => write!(f, "{} cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::Missing { field: "name" };
        assert_eq!(err.to_string(), "Missing or invalid 'name' field");

        let err = ValidationError::InvalidJson {
            reason: "expected value at line 1 column 1".into(),
        };
        assert_eq!(err.to_string(), "Invalid JSON");
    }
}
