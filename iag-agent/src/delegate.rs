//! Delegation authoring
//!
//! Mints a fresh Ed25519 keypair, signs the delegation claims, and
//! uploads the credential with its public JWK to the authorizer. In a
//! real deployment the key would belong to the user; the demo generates
//! one per submission.

use anyhow::{bail, Result};
use ed25519_compact::KeyPair;
use serde_json::json;

use iag_common::{
    jwk_for_ed25519, sign_delegation_eddsa, DelegationClaims, DelegationConstraints,
};

pub struct DelegationSpec {
    pub subject: String,
    pub agent_id: String,
    pub tool_id: String,
    pub scopes: Vec<String>,
    pub days: i64,
    pub max_amount_cents: Option<i64>,
    pub merchants: Option<Vec<String>>,
}

pub async fn submit(adp_base: &str, spec: DelegationSpec) -> Result<serde_json::Value> {
    let constraints = if spec.max_amount_cents.is_some() || spec.merchants.is_some() {
        Some(DelegationConstraints {
            max_amount_cents: spec.max_amount_cents,
            merchants: spec.merchants,
        })
    } else {
        None
    };

    let claims = DelegationClaims {
        subject: spec.subject.clone(),
        agent_id: spec.agent_id,
        tool_id: spec.tool_id,
        scopes: spec.scopes,
        not_after: Some(chrono::Utc::now().timestamp() + spec.days * 86_400),
        exp: None,
        iss: spec.subject,
        constraints,
    };

    let keypair = KeyPair::generate();
    let jws = sign_delegation_eddsa(&claims, &keypair.sk)?;
    let public_jwk = jwk_for_ed25519(&keypair.pk);

    let response = reqwest::Client::new()
        .post(format!("{}/delegations", adp_base.trim_end_matches('/')))
        .json(&json!({ "jws": jws, "public_jwk": public_jwk }))
        .send()
        .await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("delegation upload failed ({status}): {body}");
    }
    Ok(response.json().await?)
}
