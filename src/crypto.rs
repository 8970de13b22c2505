//! Invitation token generation and hashing.

use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

/// Default invitation token length in characters.
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Shortest token this crate will ever issue.
pub const MIN_TOKEN_LENGTH: usize = 30;

/// Generates a cryptographically secure, url-safe random token.
///
/// Characters are drawn from `[A-Za-z0-9]` using the thread-local CSPRNG.
/// Requests shorter than [`MIN_TOKEN_LENGTH`] are lengthened to it.
///
/// # Example
///
/// ```rust
/// use teamward::crypto::generate_token;
///
/// let token = generate_token(40);
/// assert_eq!(token.len(), 40);
/// assert_eq!(generate_token(8).len(), 30);
/// ```
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length.max(MIN_TOKEN_LENGTH))
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Hashes a token using SHA-256 for storage. Returns lowercase hex.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
