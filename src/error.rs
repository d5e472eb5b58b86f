// Keytable — Top-level error types
//
// Aggregates errors from the store and codec modules into a single
// error enum for the application boundary.

use thiserror::Error;

/// Top-level error type for all Keytable operations.
#[derive(Debug, Error)]
pub enum KeytableError {
    #[error("Store error: {0}")]
    Store(#[from] crate::store::KeystoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] crate::codec::CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, KeytableError>;
