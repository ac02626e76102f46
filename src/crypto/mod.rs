//! Symmetric encryption and integrity digests over serializable payloads.
//!
//! Payloads are serialized to JSON (the canonical form), encrypted with
//! AES-256-CBC and PKCS#7 padding under a single configured key/IV pair, and
//! rendered as standard base64. Checksums are lowercase hex SHA-256 over the
//! same canonical bytes.

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Minimum length of the configured key material, in bytes.
pub const MIN_KEY_MATERIAL_LEN: usize = 32;

/// Exact length of the initialization vector, in bytes.
pub const IV_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

/// Rejected key/IV configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("encryption key must be at least {min} bytes, got {0}", min = MIN_KEY_MATERIAL_LEN)]
    KeyTooShort(usize),

    #[error("initialization vector must be exactly {len} bytes, got {0}", len = IV_LEN)]
    InvalidIvLength(usize),
}

/// Failures of the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// A 32-byte AES-256 key.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey([u8; 32]);

impl CipherKey {
    /// Derives the AES-256 key as the SHA-256 digest of the key material.
    pub fn derive(material: &str) -> Result<Self, KeyError> {
        if material.len() < MIN_KEY_MATERIAL_LEN {
            return Err(KeyError::KeyTooShort(material.len()));
        }
        Ok(Self(Sha256::digest(material.as_bytes()).into()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(<redacted>)")
    }
}

/// A 16-byte CBC initialization vector.
#[derive(Clone, PartialEq, Eq)]
pub struct Iv([u8; IV_LEN]);

impl Iv {
    pub fn from_str_bytes(s: &str) -> Result<Self, KeyError> {
        let bytes = s.as_bytes();
        if bytes.len() != IV_LEN {
            return Err(KeyError::InvalidIvLength(bytes.len()));
        }
        let mut arr = [0u8; IV_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Iv(<redacted>)")
    }
}

/// Encrypts, decrypts and checksums structured payloads with one key/IV pair.
///
/// Holds no mutable state, so a single instance can be shared freely across
/// threads and tasks.
#[derive(Debug, Clone)]
pub struct CipherService {
    key: CipherKey,
    iv: Iv,
}

impl CipherService {
    pub fn new(key: CipherKey, iv: Iv) -> Self {
        Self { key, iv }
    }

    /// Validates the raw configured secrets and builds the service.
    pub fn from_secrets(key_material: &str, iv: &str) -> Result<Self, KeyError> {
        Ok(Self::new(CipherKey::derive(key_material)?, Iv::from_str_bytes(iv)?))
    }

    /// Serializes `payload` and returns its base64-encoded ciphertext.
    pub fn encrypt<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, CipherError> {
        let plaintext = canonical_bytes(payload)?;
        let cipher = Aes256CbcEnc::new_from_slices(self.key.as_bytes(), self.iv.as_bytes())
            .map_err(|e| CipherError::Encryption(format!("invalid key or iv: {e}")))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
        Ok(STANDARD.encode(ciphertext))
    }

    /// Inverse of [`CipherService::encrypt`].
    ///
    /// Malformed encoding, bad padding and unparseable plaintext all come back
    /// as [`CipherError::Decryption`].
    pub fn decrypt<T: DeserializeOwned>(&self, ciphertext: &str) -> Result<T, CipherError> {
        let bytes = STANDARD
            .decode(ciphertext)
            .map_err(|e| CipherError::Decryption(format!("invalid encoding: {e}")))?;
        if bytes.is_empty() || bytes.len() % BLOCK_LEN != 0 {
            return Err(CipherError::Decryption(
                "ciphertext is not a whole number of blocks".to_string(),
            ));
        }

        let cipher = Aes256CbcDec::new_from_slices(self.key.as_bytes(), self.iv.as_bytes())
            .map_err(|e| CipherError::Decryption(format!("invalid key or iv: {e}")))?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
            .map_err(|_| CipherError::Decryption("invalid padding".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| CipherError::Decryption(format!("payload did not parse: {e}")))
    }

    /// Lowercase hex SHA-256 over the canonical serialization of `payload`.
    pub fn checksum<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, CipherError> {
        let bytes = canonical_bytes(payload)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Recomputes the checksum of `payload` and compares it in constant time.
    pub fn verify_checksum<T: Serialize + ?Sized>(&self, payload: &T, digest: &str) -> bool {
        match self.checksum(payload) {
            Ok(computed) => computed.as_bytes().ct_eq(digest.as_bytes()).into(),
            Err(_) => false,
        }
    }
}

fn canonical_bytes<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>, CipherError> {
    serde_json::to_vec(payload)
        .map_err(|e| CipherError::Encryption(format!("payload could not be serialized: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    const TEST_KEY: &str = "an-encryption-key-of-at-least-32-chars";
    const TEST_IV: &str = "0123456789abcdef";

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    fn service() -> CipherService {
        CipherService::from_secrets(TEST_KEY, TEST_IV).unwrap()
    }

    fn sample() -> Sample {
        Sample {
            name: "merchant-123".to_string(),
            count: 7,
        }
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let svc = service();
        let encrypted = svc.encrypt(&sample()).unwrap();
        let decrypted: Sample = svc.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, sample());
    }

    #[test]
    fn ciphertext_is_base64_of_whole_blocks() {
        let encrypted = service().encrypt(&sample()).unwrap();
        let raw = STANDARD.decode(&encrypted).unwrap();
        assert!(!raw.is_empty());
        assert_eq!(raw.len() % BLOCK_LEN, 0);
    }

    #[test]
    fn same_key_and_iv_encrypt_deterministically() {
        let svc = service();
        assert_eq!(svc.encrypt(&sample()).unwrap(), svc.encrypt(&sample()).unwrap());
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let encrypted = service().encrypt(&sample()).unwrap();
        let other =
            CipherService::from_secrets("a-completely-different-key-material!!", TEST_IV).unwrap();
        let result: Result<Sample, _> = other.decrypt(&encrypted);
        assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    #[test]
    fn invalid_base64_fails_decryption() {
        let result: Result<Sample, _> = service().decrypt("not base64 at all!");
        assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    #[test]
    fn partial_block_fails_decryption() {
        let result: Result<Sample, _> = service().decrypt(&STANDARD.encode([1u8; 15]));
        assert!(matches!(result, Err(CipherError::Decryption(_))));

        let result: Result<Sample, _> = service().decrypt("");
        assert!(matches!(result, Err(CipherError::Decryption(_))));
    }

    #[test]
    fn unserializable_payload_fails_encryption() {
        let mut map = HashMap::new();
        map.insert((1u8, 2u8), "tuple keys cannot become JSON object keys");

        assert!(matches!(service().encrypt(&map), Err(CipherError::Encryption(_))));
        assert!(matches!(service().checksum(&map), Err(CipherError::Encryption(_))));
        assert!(!service().verify_checksum(&map, ""));
    }

    #[test]
    fn checksum_is_deterministic_and_field_sensitive() {
        let svc = service();
        let first = svc.checksum(&sample()).unwrap();
        assert_eq!(first, svc.checksum(&sample()).unwrap());
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let mut changed = sample();
        changed.count += 1;
        assert_ne!(first, svc.checksum(&changed).unwrap());
    }

    #[test]
    fn verify_checksum_detects_mismatch() {
        let svc = service();
        let digest = svc.checksum(&sample()).unwrap();
        assert!(svc.verify_checksum(&sample(), &digest));

        let mut changed = sample();
        changed.name.push('x');
        assert!(!svc.verify_checksum(&changed, &digest));
        assert!(!svc.verify_checksum(&sample(), &digest[..63]));
        assert!(!svc.verify_checksum(&sample(), &digest.to_uppercase()));
    }

    #[test]
    fn short_key_material_is_rejected() {
        assert_eq!(
            CipherService::from_secrets("too-short", TEST_IV).unwrap_err(),
            KeyError::KeyTooShort(9)
        );
    }

    #[test]
    fn iv_must_be_sixteen_bytes() {
        assert_eq!(
            CipherService::from_secrets(TEST_KEY, "short-iv").unwrap_err(),
            KeyError::InvalidIvLength(8)
        );
        assert_eq!(
            CipherService::from_secrets(TEST_KEY, "0123456789abcdef0").unwrap_err(),
            KeyError::InvalidIvLength(17)
        );
    }

    #[test]
    fn distinct_configurations_coexist() {
        let a = service();
        let b = CipherService::from_secrets(TEST_KEY, "fedcba9876543210").unwrap();
        let from_a = a.encrypt(&sample()).unwrap();
        let from_b = b.encrypt(&sample()).unwrap();
        assert_ne!(from_a, from_b);
        assert_eq!(b.decrypt::<Sample>(&from_b).unwrap(), sample());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", service());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(TEST_IV));
    }
}
