//! Delegation credential verification
//!
//! Delegations arrive as compact JWS plus the public JWK that verifies
//! them. Accepted algorithms: EdDSA, ES256, RS256. Expiry is validated
//! manually with a small clock-skew allowance; claim shape and constraint
//! rules are checked after the signature.

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use validator::Validate;

use iag_common::{DelegationClaims, IagError, Result};

const ALLOWED_ALGS: &[Algorithm] = &[Algorithm::EdDSA, Algorithm::ES256, Algorithm::RS256];

/// Clock-skew allowance for expiry checks, seconds.
pub const CLOCK_SKEW_SECS: i64 = 5;

/// Verifies a delegation credential and returns its claims.
pub fn verify_delegation(jws: &str, public_jwk: &Value, now: i64) -> Result<DelegationClaims> {
    let header = decode_header(jws)
        .map_err(|e| IagError::InvalidRequest(format!("bad JWS header: {e}")))?;
    if !ALLOWED_ALGS.contains(&header.alg) {
        return Err(IagError::InvalidRequest(format!(
            "unsupported algorithm {:?}",
            header.alg
        )));
    }

    let jwk: Jwk = serde_json::from_value(public_jwk.clone())
        .map_err(|e| IagError::InvalidRequest(format!("bad public_jwk: {e}")))?;
    let key = DecodingKey::from_jwk(&jwk)
        .map_err(|e| IagError::InvalidRequest(format!("unusable public_jwk: {e}")))?;

    // Expiry is checked below against not_after|exp with explicit skew.
    let mut validation = Validation::new(header.alg);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let decoded = decode::<DelegationClaims>(jws, &key, &validation)
        .map_err(|e| IagError::InvalidRequest(format!("signature verification failed: {e}")))?;
    let claims = decoded.claims;

    claims
        .validate()
        .map_err(|e| IagError::InvalidRequest(format!("invalid delegation claims: {e}")))?;

    let expiry = claims
        .expiry()
        .ok_or_else(|| IagError::InvalidRequest("not_after or exp is required".into()))?;
    if now > expiry + CLOCK_SKEW_SECS {
        return Err(IagError::InvalidRequest("delegation expired".into()));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_compact::KeyPair;
    use iag_common::{jwk_for_ed25519, sign_delegation_eddsa, DelegationConstraints};

    fn claims(not_after: i64) -> DelegationClaims {
        DelegationClaims {
            subject: "user-123".into(),
            agent_id: "agent-demo".into(),
            tool_id: "mcp.pay".into(),
            scopes: vec!["payments:charge".into()],
            not_after: Some(not_after),
            exp: None,
            iss: "user-123".into(),
            constraints: Some(DelegationConstraints {
                max_amount_cents: Some(2000),
                merchants: Some(vec!["mcp-tix".into()]),
            }),
        }
    }

    #[test]
    fn accepts_a_valid_eddsa_delegation() {
        let kp = KeyPair::generate();
        let jws = sign_delegation_eddsa(&claims(10_000), &kp.sk).unwrap();
        let verified = verify_delegation(&jws, &jwk_for_ed25519(&kp.pk), 100).unwrap();
        assert_eq!(verified.subject, "user-123");
        assert_eq!(
            verified.constraints.unwrap().max_amount_cents,
            Some(2000)
        );
    }

    #[test]
    fn rejects_a_foreign_key() {
        let kp = KeyPair::generate();
        let other = KeyPair::generate();
        let jws = sign_delegation_eddsa(&claims(10_000), &kp.sk).unwrap();
        let err = verify_delegation(&jws, &jwk_for_ed25519(&other.pk), 100).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[test]
    fn expiry_honors_the_skew_window() {
        let kp = KeyPair::generate();
        let jws = sign_delegation_eddsa(&claims(100), &kp.sk).unwrap();
        let jwk = jwk_for_ed25519(&kp.pk);

        // within skew of the deadline
        assert!(verify_delegation(&jws, &jwk, 104).is_ok());
        // past it
        let err = verify_delegation(&jws, &jwk, 106).unwrap_err();
        assert!(err.detail().contains("expired"));
    }

    #[test]
    fn rejects_malformed_constraints() {
        let kp = KeyPair::generate();
        let mut bad = claims(10_000);
        bad.constraints = Some(DelegationConstraints {
            max_amount_cents: Some(0),
            merchants: None,
        });
        let jws = sign_delegation_eddsa(&bad, &kp.sk).unwrap();
        let err = verify_delegation(&jws, &jwk_for_ed25519(&kp.pk), 100).unwrap_err();
        assert!(err.detail().contains("invalid delegation claims"));
    }

    #[test]
    fn rejects_claims_without_expiry() {
        let kp = KeyPair::generate();
        let mut no_expiry = claims(0);
        no_expiry.not_after = None;
        no_expiry.exp = None;
        let jws = sign_delegation_eddsa(&no_expiry, &kp.sk).unwrap();
        let err = verify_delegation(&jws, &jwk_for_ed25519(&kp.pk), 100).unwrap_err();
        assert!(err.detail().contains("not_after or exp"));
    }

    #[test]
    fn rejects_garbage_tokens() {
        let kp = KeyPair::generate();
        let err = verify_delegation("not-a-jws", &jwk_for_ed25519(&kp.pk), 100).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }
}
