//! Signed state envelope
//!
//! The OAuth `state` parameter is not an opaque nonce here: it is a signed
//! envelope binding the callback to one session. Format:
//! `base64url(payload_json) "." base64url(HMAC-SHA256(payload_json, secret))`,
//! verified in constant time. Opaque to the AS and the agent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use iag_common::{IagError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Payload bound into the state parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    /// Session id the callback must land on
    pub sid: String,

    /// Issue time, unix seconds
    pub iat: i64,

    /// Audience (RS resource identifier) the session targets
    pub aud: String,

    /// Space-joined scope string the session requested
    pub scope: String,

    /// Per-session nonce
    pub n: String,

    /// SHA-256 over the canonical JSON of the session context
    pub ctx_digest: String,
}

/// Signs and verifies state envelopes with a gateway-process secret.
#[derive(Clone)]
pub struct StateSigner {
    secret: Vec<u8>,
}

impl StateSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    pub fn sign(&self, payload: &StatePayload) -> Result<String> {
        let payload_json = serde_json::to_vec(payload)?;
        let tag = self.mac(&payload_json);
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload_json),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Verifies an envelope and returns its payload.
    ///
    /// Fails with `malformed_state` (not two dot-separated base64url
    /// parts), `bad_signature` (tag mismatch, checked in constant time),
    /// or `bad_payload` (valid tag over non-payload JSON).
    pub fn verify(&self, token: &str) -> Result<StatePayload> {
        let (payload_b64, tag_b64) = token
            .split_once('.')
            .filter(|(p, t)| !p.is_empty() && !t.is_empty() && !t.contains('.'))
            .ok_or_else(|| IagError::BadState("malformed_state".into()))?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| IagError::BadState("malformed_state".into()))?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| IagError::BadState("malformed_state".into()))?;

        let expected = self.mac(&payload_json);
        if !bool::from(expected.ct_eq(&tag)) {
            return Err(IagError::BadState("bad_signature".into()));
        }

        serde_json::from_slice(&payload_json)
            .map_err(|_| IagError::BadState("bad_payload".into()))
    }

    fn mac(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any size");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Digest of the free-form session context, bound into the state payload
/// so a callback cannot be replayed against a session with different
/// context. serde_json maps are key-sorted, so the encoding is canonical.
pub fn context_digest(context: &Map<String, Value>) -> String {
    let bytes = serde_json::to_vec(&Value::Object(context.clone())).unwrap_or_default();
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> StateSigner {
        StateSigner::new("test-state-secret")
    }

    fn payload() -> StatePayload {
        StatePayload {
            sid: "a0b1c2d3".into(),
            iat: 1_700_000_000,
            aud: "http://localhost:9091".into(),
            scope: "echo:read".into(),
            n: "nonce-1".into(),
            ctx_digest: context_digest(&Map::new()),
        }
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let p = payload();
        let token = signer().sign(&p).unwrap();
        let back = signer().verify(&token).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn wrong_secret_fails_with_bad_signature() {
        let token = signer().sign(&payload()).unwrap();
        let err = StateSigner::new("other-secret").verify(&token).unwrap_err();
        assert_eq!(err.detail(), "bad_signature");
    }

    #[test]
    fn tampered_payload_fails_with_bad_signature() {
        let token = signer().sign(&payload()).unwrap();
        let (body, tag) = token.split_once('.').unwrap();
        let mut altered = URL_SAFE_NO_PAD.decode(body).unwrap();
        altered[0] ^= 0x01;
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(&altered), tag);
        let err = signer().verify(&forged).unwrap_err();
        assert_eq!(err.detail(), "bad_signature");
    }

    #[test]
    fn garbage_fails_with_malformed_state() {
        for bad in ["", "justonepart", "two.parts.three", "!!!.???"] {
            let err = signer().verify(bad).unwrap_err();
            assert_eq!(err.detail(), "malformed_state", "input: {bad}");
        }
    }

    #[test]
    fn valid_tag_over_non_payload_fails_with_bad_payload() {
        let s = signer();
        let not_a_payload = br#"{"hello":"world"}"#;
        let token = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(not_a_payload),
            URL_SAFE_NO_PAD.encode(s.mac(not_a_payload))
        );
        let err = s.verify(&token).unwrap_err();
        assert_eq!(err.detail(), "bad_payload");
    }

    #[test]
    fn context_digest_is_order_insensitive() {
        let mut a = Map::new();
        a.insert("orderId".into(), Value::from("order-1001"));
        a.insert("amount_cents".into(), Value::from(1200));

        let mut b = Map::new();
        b.insert("amount_cents".into(), Value::from(1200));
        b.insert("orderId".into(), Value::from("order-1001"));

        assert_eq!(context_digest(&a), context_digest(&b));
        assert_ne!(context_digest(&a), context_digest(&Map::new()));
    }
}
