// Keytable — Codec error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(u64),

    #[error("Malformed key envelope: {0}")]
    Malformed(String),

    #[error("Invalid {kind} key length: {actual} bytes")]
    InvalidLength { kind: &'static str, actual: usize },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Key data is empty")]
    Empty,
}
