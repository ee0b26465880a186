//! # Token Issuance
//!
//! HS256 tokens for User records. The claim set is fixed to
//! `{"authorized": true, "username": <name>}` with no expiry, and the raw
//! bytes of the JWTKey's observed key are the HMAC secret.
//!
//! Signing is deterministic: the same claims under the same key always yield
//! the same token string, so the User reconciler can skip the status write
//! when nothing changed.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Claims embedded in every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub authorized: bool,
    pub username: String,
}

impl UserClaims {
    #[must_use]
    pub fn for_user(username: &str) -> Self {
        Self {
            authorized: true,
            username: username.to_string(),
        }
    }
}

/// Sign a token for `username` with `key_material` as the HMAC secret.
pub fn issue_token(username: &str, key_material: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let secret = Zeroizing::new(key_material.as_bytes().to_vec());
    encode(
        &Header::new(Algorithm::HS256),
        &UserClaims::for_user(username),
        &EncodingKey::from_secret(&secret),
    )
}

/// Verify an HS256 token against `key_material` and return its claims.
///
/// Tokens carry no `exp`, so expiry validation is disabled and no registered
/// claim is required.
pub fn verify_token(
    token: &str,
    key_material: &str,
) -> Result<UserClaims, jsonwebtoken::errors::Error> {
    let secret = Zeroizing::new(key_material.as_bytes().to_vec());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<UserClaims>(token, &DecodingKey::from_secret(&secret), &validation)
        .map(|data| data.claims)
}
