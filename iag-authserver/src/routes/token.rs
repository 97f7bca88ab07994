//! Token endpoint
//!
//! Redeems single-use authorization codes. The lookup-and-delete is one
//! operation under the codes lock, so a code can never be exchanged
//! twice. PKCE is verified by recomputing S256 over the presented
//! verifier. Audience resolution: resource from the token request, else
//! resource captured at /authorize, else the configured default.

use actix_web::{post, web, Responder};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use iag_common::{IagError, Result, TokenResponse};

use crate::jwt::{self, AccessClaims};
use crate::{now_ts, AppState};

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub grant_type: String,
    pub code: String,
    pub redirect_uri: String,
    pub client_id: String,
    pub code_verifier: String,
    pub resource: Option<String>,
}

#[post("/token")]
pub async fn token(
    state: web::Data<AppState>,
    form: web::Form<TokenForm>,
) -> Result<impl Responder> {
    let form = form.into_inner();

    if form.grant_type != "authorization_code" {
        return Err(IagError::InvalidGrant(format!(
            "unsupported grant_type {}",
            form.grant_type
        )));
    }

    // Atomic redemption: the code leaves the map before anything else is
    // checked, so a concurrent replay sees it gone.
    let pending = state
        .codes
        .lock()
        .expect("codes lock poisoned")
        .remove(&form.code)
        .ok_or_else(|| IagError::InvalidGrant("unknown or already redeemed code".into()))?;

    if pending.client_id != form.client_id || pending.redirect_uri != form.redirect_uri {
        warn!(client_id = %form.client_id, "token request does not match authorization");
        return Err(IagError::InvalidGrant(
            "client_id or redirect_uri does not match the authorization".into(),
        ));
    }

    let computed = URL_SAFE_NO_PAD.encode(Sha256::digest(form.code_verifier.as_bytes()));
    if computed != pending.code_challenge {
        return Err(IagError::BadPkce);
    }

    let aud = form
        .resource
        .or(pending.resource)
        .unwrap_or_else(|| state.config.default_aud.clone());

    let now = now_ts();
    let claims = AccessClaims {
        iss: state.config.issuer.clone(),
        sub: state.config.demo_sub.clone(),
        scope: pending.scope.clone(),
        aud,
        iat: now,
        exp: now + state.config.token_ttl,
    };
    let access_token = jwt::mint(&claims, &state.config.jwt_secret)?;
    info!(client_id = %form.client_id, aud = %claims.aud, scope = %claims.scope, "token issued");

    Ok(web::Json(TokenResponse {
        access_token,
        token_type: "Bearer".into(),
        expires_in: Some(state.config.token_ttl),
        refresh_token: None,
        scope: Some(pending.scope),
    }))
}
