//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid account address.
    #[error("Invalid account address '{0}' (expected 20 bytes of hex)")]
    InvalidAddress(String),

    /// Invalid role identifier.
    #[error("Invalid role identifier '{0}' (expected 32 bytes of hex)")]
    InvalidRole(String),

    /// Invalid review token id.
    #[error("Invalid token id '{0}' (expected a canonical decimal uint256)")]
    InvalidTokenId(String),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
