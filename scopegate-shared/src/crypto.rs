//! Payload encryption for response envelopes
//!
//! Selected endpoints return their `data` field encrypted with AES-256-GCM.
//! Each call derives a fresh key from the static secret and a random salt,
//! so two encryptions of the same payload never share key or ciphertext.
//!
//! # Wire format
//!
//! ```text
//! base64( salt[64] || iv[12] || tag[16] || ciphertext )
//! ```
//!
//! The key is PBKDF2-HMAC-SHA512(secret, salt, 100 000 iterations, 32 bytes).
//! There is no version byte and no key rotation.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce, Tag,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha512;

/// Random salt length
pub const SALT_LEN: usize = 64;

/// GCM nonce length
pub const IV_LEN: usize = 12;

/// GCM authentication tag length
pub const TAG_LEN: usize = 16;

/// PBKDF2 rounds used in production
pub const DEFAULT_ITERATIONS: u32 = 100_000;

const KEY_LEN: usize = 32;
const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

/// Errors from payload encryption
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("encryption failed")]
    Encryption,

    /// Wrong secret, tampered data, or truncated ciphertext
    #[error("decryption failed")]
    Decryption,

    #[error("invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload too short: expected at least {HEADER_LEN} bytes, got {0}")]
    TooShort(usize),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stateless AES-256-GCM codec keyed by a static secret
#[derive(Clone)]
pub struct PayloadCipher {
    secret: Vec<u8>,
    iterations: u32,
}

impl PayloadCipher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Overrides the PBKDF2 round count
    ///
    /// Both ends must agree on the value; the count is not carried in the
    /// payload.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    fn cipher_for(&self, salt: &[u8]) -> Aes256Gcm {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha512>(&self.secret, salt, self.iterations, &mut key);
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key))
    }

    /// Encrypts raw bytes into the base64 wire format
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let mut salt = [0u8; SALT_LEN];
        let mut iv = [0u8; IV_LEN];
        aes_gcm::aead::rand_core::RngCore::fill_bytes(&mut OsRng, &mut salt);
        aes_gcm::aead::rand_core::RngCore::fill_bytes(&mut OsRng, &mut iv);

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher_for(&salt)
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| CipherError::Encryption)?;

        let mut out = Vec::with_capacity(HEADER_LEN + buffer.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&iv);
        out.extend_from_slice(tag.as_slice());
        out.extend_from_slice(&buffer);

        Ok(STANDARD.encode(out))
    }

    /// Decrypts the base64 wire format back into raw bytes
    pub fn decrypt(&self, encoded: &str) -> Result<Vec<u8>, CipherError> {
        let raw = STANDARD.decode(encoded.trim())?;
        if raw.len() < HEADER_LEN {
            return Err(CipherError::TooShort(raw.len()));
        }

        let (salt, rest) = raw.split_at(SALT_LEN);
        let (iv, rest) = rest.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut buffer = ciphertext.to_vec();
        self.cipher_for(salt)
            .decrypt_in_place_detached(Nonce::from_slice(iv), b"", &mut buffer, Tag::from_slice(tag))
            .map_err(|_| CipherError::Decryption)?;

        Ok(buffer)
    }

    /// Serializes `value` to JSON and encrypts it
    pub fn encrypt_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CipherError> {
        let bytes = serde_json::to_vec(value)?;
        self.encrypt(&bytes)
    }

    /// Decrypts and deserializes a JSON payload
    pub fn decrypt_json<T: DeserializeOwned>(&self, encoded: &str) -> Result<T, CipherError> {
        let bytes = self.decrypt(encoded)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl std::fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCipher")
            .field("secret", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "encryption-secret-at-least-32-bytes!";

    fn cipher() -> PayloadCipher {
        PayloadCipher::new(SECRET).with_iterations(1_000)
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let value = json!({
            "items": [{"id": "7f1c", "title": "Hello, wörld", "tags": ["a", "b"]}],
            "total": 1,
            "page": 1,
            "nested": {"null": null, "float": 1.5, "neg": -3}
        });

        let plain = serde_json::to_vec(&value).unwrap();
        let encoded = cipher().encrypt_json(&value).unwrap();

        assert_eq!(cipher().decrypt(&encoded).unwrap(), plain);

        let back: serde_json::Value = cipher().decrypt_json(&encoded).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_layout() {
        let encoded = cipher().encrypt(b"abc").unwrap();
        let raw = STANDARD.decode(&encoded).unwrap();
        assert_eq!(raw.len(), HEADER_LEN + 3);
    }

    #[test]
    fn test_fresh_salt_and_iv_per_call() {
        let a = cipher().encrypt(b"same payload").unwrap();
        let b = cipher().encrypt(b"same payload").unwrap();
        assert_ne!(a, b);

        let (ra, rb) = (STANDARD.decode(&a).unwrap(), STANDARD.decode(&b).unwrap());
        assert_ne!(ra[..SALT_LEN], rb[..SALT_LEN]);
    }

    #[test]
    fn test_empty_payload() {
        let encoded = cipher().encrypt(b"").unwrap();
        assert!(cipher().decrypt(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let encoded = cipher().encrypt(b"sensitive").unwrap();
        let mut raw = STANDARD.decode(&encoded).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        let result = cipher().decrypt(&STANDARD.encode(raw));
        assert!(matches!(result, Err(CipherError::Decryption)));
    }

    #[test]
    fn test_tampered_tag_rejected() {
        let encoded = cipher().encrypt(b"sensitive").unwrap();
        let mut raw = STANDARD.decode(&encoded).unwrap();
        raw[SALT_LEN + IV_LEN] ^= 0x80;

        assert!(cipher().decrypt(&STANDARD.encode(raw)).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let encoded = cipher().encrypt(b"sensitive").unwrap();
        let other = PayloadCipher::new("another-secret-that-is-32-bytes-long").with_iterations(1_000);

        assert!(matches!(other.decrypt(&encoded), Err(CipherError::Decryption)));
    }

    #[test]
    fn test_iteration_mismatch_rejected() {
        let encoded = cipher().encrypt(b"sensitive").unwrap();
        let other = PayloadCipher::new(SECRET).with_iterations(2_000);

        assert!(other.decrypt(&encoded).is_err());
    }

    #[test]
    fn test_short_input_rejected() {
        let short = STANDARD.encode([0u8; HEADER_LEN - 1]);
        assert!(matches!(
            cipher().decrypt(&short),
            Err(CipherError::TooShort(n)) if n == HEADER_LEN - 1
        ));
    }

    #[test]
    fn test_invalid_base64_rejected() {
        assert!(matches!(
            cipher().decrypt("not base64 at all!"),
            Err(CipherError::Encoding(_))
        ));
    }

    #[test]
    fn test_default_iterations() {
        let cipher = PayloadCipher::new(SECRET);
        let encoded = cipher.encrypt_json(&json!({"ok": true})).unwrap();
        let back: serde_json::Value = cipher.decrypt_json(&encoded).unwrap();
        assert_eq!(back, json!({"ok": true}));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", cipher());
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("REDACTED"));
    }
}
