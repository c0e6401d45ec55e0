//! Error handling module
//!
//! Provides unified error types for loading, scanning and reconciling topologies.
//! The diff engine itself never fails and has no error type.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Introspection error: {0}")]
    Introspection(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl From<mongodb::bson::document::ValueAccessError> for AppError {
    fn from(error: mongodb::bson::document::ValueAccessError) -> Self {
        AppError::Introspection(error.to_string())
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}

/// Helper function to create an introspection error
pub fn introspection_error(msg: impl Into<String>) -> AppError {
    AppError::Introspection(msg.into())
}
