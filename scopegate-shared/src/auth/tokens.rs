/// One-time token utilities
///
/// Email verification links, password reset links and refresh tokens are
/// backed by opaque values that are only ever stored as SHA-256 hashes.
///
/// # Format
///
/// One-time tokens are 48 random base62 characters (`[A-Za-z0-9]`), safe to
/// embed in URLs without escaping.
///
/// # Example
///
/// ```
/// use scopegate_shared::auth::tokens::{generate_token, hash_token};
///
/// let (token, hash) = generate_token();
/// assert_eq!(token.len(), 48);
/// assert_eq!(hash, hash_token(&token));
/// assert_eq!(hash.len(), 64);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a generated one-time token
pub const TOKEN_LENGTH: usize = 48;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a new one-time token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hex_hash)
pub fn generate_token() -> (String, String) {
    let mut rng = rand::thread_rng();

    let token: String = (0..TOKEN_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    let hash = hash_token(&token);

    (token, hash)
}

/// Hashes a token with SHA-256, hex-encoded (64 characters)
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Errors redeeming a one-time token
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not shaped like a generated token
    #[error("Malformed token")]
    Malformed,

    /// Unknown, expired, or already used
    #[error("Invalid or expired token")]
    InvalidOrExpired,
}

/// Checks that a presented token has the generated shape
///
/// Used to reject garbage before touching the database.
pub fn validate_token_format(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Validates a presented token and returns the hash to look it up by
pub fn lookup_hash(token: &str) -> Result<String, TokenError> {
    let token = token.trim();
    if !validate_token_format(token) {
        return Err(TokenError::Malformed);
    }

    Ok(hash_token(token))
}
