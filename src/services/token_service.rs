use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

use crate::types::errors::TokenError;

/// Random bytes per share token. 18 bytes encode to 24 URL-safe characters.
pub const TOKEN_BYTES: usize = 18;

/// Length of an encoded share token.
pub const TOKEN_LENGTH: usize = 24;

/// Characters of a token that may appear in logs.
const LOG_PREFIX_LENGTH: usize = 6;

/// Trait defining share token generation.
pub trait TokenServiceTrait: Send + Sync {
    /// Generates a new unguessable, URL-safe share token.
    fn generate_token(&self) -> Result<String, TokenError>;
}

/// Token generator backed by the `ring` system random source.
pub struct TokenService {
    rng: SystemRandom,
}

impl TokenService {
    /// Creates a new TokenService instance.
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Generates cryptographically secure random bytes of the specified length.
    pub fn generate_random_bytes(&self, length: usize) -> Result<Vec<u8>, TokenError> {
        let mut bytes = vec![0u8; length];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| TokenError::RandomGeneration("System random source failed".to_string()))?;
        Ok(bytes)
    }
}

impl Default for TokenService {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenServiceTrait for TokenService {
    fn generate_token(&self) -> Result<String, TokenError> {
        let mut bytes = self.generate_random_bytes(TOKEN_BYTES)?;
        let token = URL_SAFE_NO_PAD.encode(&bytes);
        bytes.zeroize();
        Ok(token)
    }
}

/// Shortened token for log lines.
pub fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(LOG_PREFIX_LENGTH)
        .map_or(token.len(), |(i, _)| i);
    &token[..end]
}
