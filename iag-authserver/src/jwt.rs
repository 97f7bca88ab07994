//! Access-token minting and verification (HS256, demo-signed)

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use iag_common::{IagError, Result};

/// Claims of an issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,

    /// Audience invariant: equals the resource indicator the client
    /// supplied, or the configured default when none arrived.
    pub aud: String,

    pub iat: i64,
    pub exp: i64,
}

pub fn mint(claims: &AccessClaims, secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| IagError::Internal(format!("token minting failed: {e}")))
}

/// Verifies signature, issuer and expiry; audience is the caller's
/// business (the RS checks it against its own identifier).
pub fn verify(token: &str, secret: &str, issuer: &str) -> std::result::Result<AccessClaims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_aud = false;
    validation.leeway = 5;

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
