//! Component runtime errors

use thiserror::Error;

use tessera_core::PropertyError;
use tessera_host::HostError;

/// Errors surfaced by component operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElementError {
    /// A property projection refused the operation
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// The host platform refused the operation
    #[error(transparent)]
    Host(#[from] HostError),

    /// The operation needs a mounted instance
    #[error("Component <{0}> is not connected")]
    NotConnected(String),
}

/// Result type for component operations
pub type Result<T> = std::result::Result<T, ElementError>;
