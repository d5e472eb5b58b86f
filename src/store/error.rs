// Keytable — Store error types

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Failed to serialize key: {0}")]
    Serialization(#[source] CodecError),

    #[error("Failed to deserialize key: {0}")]
    Deserialization(#[source] CodecError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),
}
