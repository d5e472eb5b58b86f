// Keytable — Library root
//
// Re-exports the store, codec, and CLI modules.

pub mod cli;
pub mod codec;
pub mod error;
pub mod store;

pub use codec::{EnvelopeCodec, KeyCodec, KeyType, PrivateKey, RawCodec};
pub use error::{KeytableError, Result};
pub use store::{Keystore, KeystoreError, KeystoreOptions, SqlKeystore};
