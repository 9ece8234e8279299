//! HabitBell error types.

use crate::validation::ValidationErrors;

pub type Result<T> = std::result::Result<T, HabitBellError>;

#[derive(Debug, thiserror::Error)]
pub enum HabitBellError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationErrors> for HabitBellError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}
