// Keytable — Key Codec Module
//
// Turns private keys into the opaque byte blobs stored in the `data` column
// and back. The store never interprets these bytes; it only hands them to a
// `KeyCodec`.

mod envelope;
mod error;
mod key;
mod raw;

pub use envelope::EnvelopeCodec;
pub use error::CodecError;
pub use key::{KeyType, PrivateKey};
pub use raw::RawCodec;

use zeroize::Zeroizing;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Byte serialization for the key type a store holds.
pub trait KeyCodec {
    /// The in-memory key representation.
    type Key;

    /// Serialize a key into bytes suitable for storage.
    fn marshal(&self, key: &Self::Key) -> Result<Zeroizing<Vec<u8>>, CodecError>;

    /// Parse stored bytes back into a key.
    fn unmarshal(&self, bytes: &[u8]) -> Result<Self::Key, CodecError>;
}
