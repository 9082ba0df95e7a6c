//! Unit tests for share token generation.

use std::collections::HashSet;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use passdrop::services::token_service::{
    token_prefix, TokenService, TokenServiceTrait, TOKEN_BYTES, TOKEN_LENGTH,
};

#[test]
fn test_token_has_fixed_length() {
    let svc = TokenService::new();
    for _ in 0..32 {
        assert_eq!(svc.generate_token().unwrap().len(), TOKEN_LENGTH);
    }
}

#[test]
fn test_token_is_url_safe_base64_of_token_bytes() {
    let token = TokenService::new().generate_token().unwrap();
    assert!(token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    let decoded = URL_SAFE_NO_PAD.decode(&token).unwrap();
    assert_eq!(decoded.len(), TOKEN_BYTES);
}

#[test]
fn test_tokens_do_not_repeat() {
    let svc = TokenService::new();
    let tokens: HashSet<String> = (0..1000).map(|_| svc.generate_token().unwrap()).collect();
    assert_eq!(tokens.len(), 1000);
}

#[test]
fn test_token_prefix_never_exposes_full_token() {
    let token = TokenService::new().generate_token().unwrap();
    let prefix = token_prefix(&token);
    assert_eq!(prefix.len(), 6);
    assert!(token.starts_with(prefix));
    assert_eq!(token_prefix("abc"), "abc");
}
