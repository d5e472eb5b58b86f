// Keytable — Private key envelope codec
//
// Wire format is a two-field protobuf message:
//
//   field 1 (varint): key type code (1 = Ed25519, 2 = secp256k1)
//   field 2 (bytes):  raw key data
//
// This matches the private-key encoding used by libp2p, so blobs written by
// other implementations of the same table layout can be read back.

use zeroize::Zeroizing;

use super::{CodecError, KeyCodec, KeyType, PrivateKey};

/// Protobuf tag for field 1, wire type 0 (varint).
const TAG_KEY_TYPE: u64 = 1 << 3;

/// Protobuf tag for field 2, wire type 2 (length-delimited).
const TAG_DATA: u64 = (2 << 3) | 2;

/// Upper bound on the fixed overhead of an envelope (two tags, two varints).
const ENVELOPE_OVERHEAD: usize = 1 + 10 + 1 + 10;

/// Default codec for [`PrivateKey`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvelopeCodec;

impl KeyCodec for EnvelopeCodec {
    type Key = PrivateKey;

    fn marshal(&self, key: &PrivateKey) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        let data = key.secret_bytes();

        // Sized up front so the buffer never reallocates and leaves a copy
        // of the secret behind.
        let mut out = Zeroizing::new(Vec::with_capacity(data.len() + ENVELOPE_OVERHEAD));
        put_varint(&mut out, TAG_KEY_TYPE);
        put_varint(&mut out, key.key_type().code());
        put_varint(&mut out, TAG_DATA);
        put_varint(&mut out, data.len() as u64);
        out.extend_from_slice(&data);

        Ok(out)
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<PrivateKey, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }

        let mut pos = 0;
        // proto3 default for an absent enum field is 0, which no supported type uses
        let mut key_type = 0u64;
        let mut data: Option<&[u8]> = None;

        while pos < bytes.len() {
            let tag = read_varint(bytes, &mut pos)?;
            match tag {
                TAG_KEY_TYPE => key_type = read_varint(bytes, &mut pos)?,
                TAG_DATA => {
                    let len = usize::try_from(read_varint(bytes, &mut pos)?)
                        .map_err(|_| CodecError::Malformed("data length overflows".to_string()))?;
                    let end = pos
                        .checked_add(len)
                        .filter(|end| *end <= bytes.len())
                        .ok_or_else(|| CodecError::Malformed("data field is truncated".to_string()))?;
                    data = Some(&bytes[pos..end]);
                    pos = end;
                }
                other => {
                    return Err(CodecError::Malformed(format!(
                        "unexpected field {} with wire type {}",
                        other >> 3,
                        other & 0x7
                    )));
                }
            }
        }

        let kind = KeyType::from_code(key_type)?;
        match data {
            Some(data) if !data.is_empty() => PrivateKey::from_parts(kind, data),
            _ => Err(CodecError::Empty),
        }
    }
}

fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn read_varint(bytes: &[u8], pos: &mut usize) -> Result<u64, CodecError> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| CodecError::Malformed("truncated varint".to_string()))?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::Malformed("varint is longer than 64 bits".to_string()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_envelope_layout() {
        let key = PrivateKey::generate_ed25519();
        let bytes = EnvelopeCodec.marshal(&key).unwrap();

        assert_eq!(bytes.len(), 4 + 64);
        assert_eq!(&bytes[..4], &[0x08, 0x01, 0x12, 0x40]);
        assert_eq!(&bytes[4..], &key.secret_bytes()[..]);
    }

    #[test]
    fn test_secp256k1_envelope_layout() {
        let key = PrivateKey::generate_secp256k1();
        let bytes = EnvelopeCodec.marshal(&key).unwrap();

        assert_eq!(&bytes[..4], &[0x08, 0x02, 0x12, 0x20]);
        let decoded = EnvelopeCodec.unmarshal(&bytes).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_fields_in_reverse_order_are_accepted() {
        let key = PrivateKey::generate_ed25519();
        let secret = key.secret_bytes();

        let mut bytes = vec![0x12, 0x40];
        bytes.extend_from_slice(&secret);
        bytes.extend_from_slice(&[0x08, 0x01]);

        assert_eq!(EnvelopeCodec.unmarshal(&bytes).unwrap(), key);
    }

    #[test]
    fn test_marshal_buffer_is_sized_up_front() {
        for key in [PrivateKey::generate_ed25519(), PrivateKey::generate_secp256k1()] {
            let data_len = key.secret_bytes().len();
            let bytes = EnvelopeCodec.marshal(&key).unwrap();

            assert_eq!(bytes.capacity(), data_len + ENVELOPE_OVERHEAD);
            assert!(bytes.len() <= bytes.capacity());
        }
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(EnvelopeCodec.unmarshal(&[]), Err(CodecError::Empty)));
    }

    #[test]
    fn test_missing_data_field_is_rejected() {
        let err = EnvelopeCodec.unmarshal(&[0x08, 0x01]).unwrap_err();
        assert!(matches!(err, CodecError::Empty));
    }

    #[test]
    fn test_missing_key_type_is_unsupported() {
        let mut bytes = vec![0x12, 0x20];
        bytes.extend_from_slice(&[1u8; 32]);

        let err = EnvelopeCodec.unmarshal(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedKeyType(0)));
    }

    #[test]
    fn test_unknown_key_type_is_rejected() {
        let mut bytes = vec![0x08, 0x03, 0x12, 0x20];
        bytes.extend_from_slice(&[1u8; 32]);

        let err = EnvelopeCodec.unmarshal(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedKeyType(3)));
    }

    #[test]
    fn test_truncated_data_is_rejected() {
        let key = PrivateKey::generate_ed25519();
        let bytes = EnvelopeCodec.marshal(&key).unwrap();

        let err = EnvelopeCodec.unmarshal(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn test_unexpected_field_is_rejected() {
        let err = EnvelopeCodec.unmarshal(&[0x18, 0x01]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn test_truncated_varint_is_rejected() {
        let err = EnvelopeCodec.unmarshal(&[0x08, 0x81]).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn test_multibyte_varint_roundtrip() {
        let mut buf = Vec::new();
        put_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xac, 0x02]);

        let mut pos = 0;
        assert_eq!(read_varint(&buf, &mut pos).unwrap(), 300);
        assert_eq!(pos, 2);
    }
}
