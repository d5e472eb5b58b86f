// Keytable — Pass-through codec
//
// Stores caller-supplied bytes as-is, for keys whose encoding is handled
// entirely outside this crate.

use zeroize::Zeroizing;

use super::{CodecError, KeyCodec};

#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl KeyCodec for RawCodec {
    type Key = Zeroizing<Vec<u8>>;

    fn marshal(&self, key: &Self::Key) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        if key.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(key.clone())
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<Self::Key, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        Ok(Zeroizing::new(bytes.to_vec()))
    }
}
