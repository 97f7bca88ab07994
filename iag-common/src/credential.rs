//! Delegation credential minting
//!
//! A delegation is a compact signed token (JWS): `base64url(header) "."
//! base64url(claims) "." base64url(signature)`. The authorizer verifies
//! EdDSA, ES256 and RS256; this module mints the EdDSA variant, which is
//! what the demo agent and the tests use.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_compact::{PublicKey, SecretKey};
use serde_json::{json, Value};

use crate::error::{IagError, Result};
use crate::types::DelegationClaims;

/// Mint a compact EdDSA-signed delegation credential.
pub fn sign_delegation_eddsa(claims: &DelegationClaims, sk: &SecretKey) -> Result<String> {
    let header = URL_SAFE_NO_PAD.encode(
        serde_json::to_vec(&json!({"alg": "EdDSA", "typ": "JWT"}))?,
    );
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header}.{payload}");
    let signature = sk.sign(signing_input.as_bytes(), None);
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.as_ref())
    ))
}

/// Public JWK (RFC 7517, `OKP`/`Ed25519`) for a signing key, in the shape
/// `POST /delegations` expects alongside the JWS.
pub fn jwk_for_ed25519(pk: &PublicKey) -> Value {
    json!({
        "kty": "OKP",
        "crv": "Ed25519",
        "x": URL_SAFE_NO_PAD.encode(pk.as_ref()),
    })
}

impl From<ed25519_compact::Error> for IagError {
    fn from(err: ed25519_compact::Error) -> Self {
        IagError::Internal(format!("ed25519 error: {err}"))
    }
}
