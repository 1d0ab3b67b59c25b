//! Property error types

use thiserror::Error;

use crate::value::PropValue;

/// Errors raised by property projections
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// No projection with this name is declared
    #[error("Unknown property: {0}")]
    Unknown(String),

    /// The projection has no write path
    #[error("Property is read-only: {0}")]
    ReadOnly(String),

    /// The projection has no read path
    #[error("Property is write-only: {0}")]
    WriteOnly(String),

    /// The written value failed the projection's guard
    #[error("Value {value} rejected by guard of property {name}")]
    GuardRejected { name: String, value: PropValue },
}

/// Result type for property operations
pub type Result<T> = std::result::Result<T, PropertyError>;
