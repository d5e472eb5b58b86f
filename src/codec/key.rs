// Keytable — Private key model
//
// SECURITY: secret material is never included in Debug output. Use
// `public_key_hex()` when a key needs to be shown to a human.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::CodecError;

/// Length of an Ed25519 seed.
const ED25519_SEED_LEN: usize = 32;

/// Length of an Ed25519 keypair (seed followed by the public key).
const ED25519_KEYPAIR_LEN: usize = 64;

/// Length of a secp256k1 secret scalar.
const SECP256K1_SECRET_LEN: usize = 32;

/// Algorithm of a stored private key, with its envelope type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Ed25519,
    Secp256k1,
}

impl KeyType {
    /// Numeric code written into the key envelope.
    pub fn code(&self) -> u64 {
        match self {
            KeyType::Ed25519 => 1,
            KeyType::Secp256k1 => 2,
        }
    }

    pub fn from_code(code: u64) -> Result<Self, CodecError> {
        match code {
            1 => Ok(KeyType::Ed25519),
            2 => Ok(KeyType::Secp256k1),
            other => Err(CodecError::UnsupportedKeyType(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::Secp256k1 => "secp256k1",
        }
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "secp256k1" | "secp" => Ok(KeyType::Secp256k1),
            other => Err(format!("unknown key type '{}'", other)),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A private key held by the store.
#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(SigningKey),
    Secp256k1(k256::SecretKey),
}

impl PrivateKey {
    /// Generate a fresh key of the given type from the OS RNG.
    pub fn generate(kind: KeyType) -> Self {
        match kind {
            KeyType::Ed25519 => Self::generate_ed25519(),
            KeyType::Secp256k1 => Self::generate_secp256k1(),
        }
    }

    pub fn generate_ed25519() -> Self {
        PrivateKey::Ed25519(SigningKey::generate(&mut OsRng))
    }

    pub fn generate_secp256k1() -> Self {
        PrivateKey::Secp256k1(k256::SecretKey::random(&mut OsRng))
    }

    /// Rebuild a key from its type and raw secret bytes.
    ///
    /// Ed25519 accepts either the 64-byte keypair form (the public half must
    /// match the seed) or a bare 32-byte seed.
    pub fn from_parts(kind: KeyType, data: &[u8]) -> Result<Self, CodecError> {
        match kind {
            KeyType::Ed25519 => match data.len() {
                ED25519_KEYPAIR_LEN => {
                    let mut bytes = Zeroizing::new([0u8; ED25519_KEYPAIR_LEN]);
                    bytes.copy_from_slice(data);
                    SigningKey::from_keypair_bytes(&bytes)
                        .map(PrivateKey::Ed25519)
                        .map_err(|e| CodecError::InvalidKey(e.to_string()))
                }
                ED25519_SEED_LEN => {
                    let mut seed = Zeroizing::new([0u8; ED25519_SEED_LEN]);
                    seed.copy_from_slice(data);
                    Ok(PrivateKey::Ed25519(SigningKey::from_bytes(&seed)))
                }
                actual => Err(CodecError::InvalidLength {
                    kind: "ed25519",
                    actual,
                }),
            },
            KeyType::Secp256k1 => {
                if data.len() != SECP256K1_SECRET_LEN {
                    return Err(CodecError::InvalidLength {
                        kind: "secp256k1",
                        actual: data.len(),
                    });
                }
                k256::SecretKey::from_slice(data)
                    .map(PrivateKey::Secp256k1)
                    .map_err(|_| CodecError::InvalidKey("secp256k1 scalar out of range".to_string()))
            }
        }
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            PrivateKey::Ed25519(_) => KeyType::Ed25519,
            PrivateKey::Secp256k1(_) => KeyType::Secp256k1,
        }
    }

    /// Raw secret bytes in envelope form: the 64-byte keypair for Ed25519,
    /// the 32-byte scalar for secp256k1.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        match self {
            PrivateKey::Ed25519(key) => Zeroizing::new(key.to_keypair_bytes().to_vec()),
            PrivateKey::Secp256k1(key) => Zeroizing::new(key.to_bytes().to_vec()),
        }
    }

    /// Public key bytes (compressed SEC1 for secp256k1).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        match self {
            PrivateKey::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
            PrivateKey::Secp256k1(key) => key
                .public_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PrivateKey::Ed25519(a), PrivateKey::Ed25519(b)) => a == b,
            (PrivateKey::Secp256k1(a), PrivateKey::Secp256k1(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PrivateKey {}

/// Custom Debug implementation that NEVER reveals the secret.
impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type())
            .field("public_key", &self.public_key_hex())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
