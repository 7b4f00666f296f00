//! Cryptographic primitives for PowChain

use crate::error::{ChainError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

pub const ADDRESS_PREFIX: &str = "0x";
/// Hex characters taken from the tail of a compressed public key.
pub const ADDRESS_KEY_CHARS: usize = 40;
pub const ADDRESS_LENGTH: usize = ADDRESS_PREFIX.len() + ADDRESS_KEY_CHARS;

/// Returns the last `n` characters of `s` (all of `s` when shorter).
fn last_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let start = s
        .char_indices()
        .nth(count - n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

/// Account identifier: `0x` followed by the low 160 bits of a compressed public key, in hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let key_hex = hex::encode(public_key.serialize());
        Address(format!("{}{}", ADDRESS_PREFIX, last_chars(&key_hex, ADDRESS_KEY_CHARS)))
    }

    pub fn from_string(address: &str) -> Result<Self> {
        if address.chars().count() != ADDRESS_LENGTH {
            return Err(ChainError::InvalidAddress(format!(
                "address must be {} characters long, got {}",
                ADDRESS_LENGTH,
                address.chars().count()
            )));
        }
        if !address.starts_with(ADDRESS_PREFIX) {
            return Err(ChainError::InvalidAddress(format!(
                "address must start with {}",
                ADDRESS_PREFIX
            )));
        }
        Ok(Address(address.to_string()))
    }

    pub fn from_compressed_key_string(public_key: &str) -> Result<Self> {
        if public_key.chars().count() < ADDRESS_KEY_CHARS {
            return Err(ChainError::InvalidAddress(
                "public key is too short to create an address".to_string(),
            ));
        }
        Ok(Address(format!(
            "{}{}",
            ADDRESS_PREFIX,
            last_chars(public_key, ADDRESS_KEY_CHARS)
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the low 160 bits of `public_key` (hex) match this address.
    pub fn is_owned_by(&self, public_key: &str) -> bool {
        last_chars(&self.0, ADDRESS_KEY_CHARS) == last_chars(public_key, ADDRESS_KEY_CHARS)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        Address::from_string(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ChainError;

    fn try_from(value: String) -> Result<Self> {
        Address::from_string(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    pub fn from_secret_hex(secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(secret_hex)
            .map_err(|e| ChainError::CryptoError(format!("Invalid secret key hex: {}", e)))?;
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key)
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    /// Compressed public key as lowercase hex (66 characters).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Signs the SHA-256 digest of `message`; returns the compact signature in base64.
    pub fn sign(&self, message: &[u8]) -> String {
        let digest: [u8; 32] = Sha256::digest(message).into();
        let message = Message::from_digest(digest);
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);
        let compact: [u8; COMPACT_SIGNATURE_SIZE] = signature.serialize_compact();
        STANDARD.encode(compact)
    }
}

pub fn parse_public_key(public_key_hex: &str) -> Result<PublicKey> {
    let bytes = hex::decode(public_key_hex)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key hex: {}", e)))?;
    if bytes.len() != PUBLIC_KEY_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        )));
    }
    PublicKey::from_slice(&bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))
}

/// Verifies a base64 compact ECDSA signature over `message` against a hex compressed public key.
///
/// Every failure, including unparseable key or signature material, is reported as
/// [`ChainError::SignatureInvalid`].
pub fn verify_signature(public_key_hex: &str, message: &[u8], signature_b64: &str) -> Result<()> {
    let public_key = parse_public_key(public_key_hex).map_err(|e| {
        tracing::debug!("rejecting signature: {}", e);
        ChainError::SignatureInvalid
    })?;

    let signature_bytes = STANDARD
        .decode(signature_b64)
        .map_err(|_| ChainError::SignatureInvalid)?;
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::SignatureInvalid);
    }
    let signature =
        Signature::from_compact(&signature_bytes).map_err(|_| ChainError::SignatureInvalid)?;

    let digest: [u8; 32] = Sha256::digest(message).into();
    let message = Message::from_digest(digest);

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ChainError::SignatureInvalid)
}
