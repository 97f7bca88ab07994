//! Dev-only inspection endpoints
//!
//! The only surfaces allowed to show a raw access token. Keep them off
//! any deployment that matters.

use actix_web::{get, post, web, Responder};
use serde::Deserialize;
use tracing::info;

use iag_common::{IagError, Result};

use crate::{now_ts, AppState};

#[post("/debug/session/reset")]
pub async fn session_reset(state: web::Data<AppState>) -> Result<impl Responder> {
    let cleared = state.sessions.reset().await;
    info!(cleared, "session table reset");
    Ok(web::Json(serde_json::json!({ "cleared": cleared })))
}

#[derive(Debug, Deserialize)]
pub struct SidQuery {
    pub sid: String,
}

#[get("/debug/token")]
pub async fn debug_token(
    state: web::Data<AppState>,
    query: web::Query<SidQuery>,
) -> Result<impl Responder> {
    let session = state
        .sessions
        .get(&query.sid)
        .await
        .ok_or_else(|| IagError::InvalidRequest("unknown sid".into()))?;

    Ok(web::Json(serde_json::json!({
        "sid": session.sid,
        "ready": session.is_ready(now_ts()),
        "access_token": session.access_token,
        "expires_at": session.expires_at,
        "scope": session.scope_string,
        "obligations": session.obligations,
    })))
}

#[get("/debug/introspect")]
pub async fn debug_introspect(
    state: web::Data<AppState>,
    query: web::Query<SidQuery>,
) -> Result<impl Responder> {
    let session = state
        .sessions
        .get(&query.sid)
        .await
        .ok_or_else(|| IagError::InvalidRequest("unknown sid".into()))?;
    let token = session
        .access_token
        .as_deref()
        .ok_or(IagError::LoginRequired)?;
    let endpoint = session
        .as_metadata
        .introspection_endpoint
        .as_deref()
        .ok_or_else(|| IagError::InvalidRequest("AS advertises no introspection endpoint".into()))?;

    let response = state
        .http
        .post(endpoint)
        .form(&[("token", token)])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(IagError::IntrospectionFailed(format!(
            "introspection returned {}",
            response.status()
        )));
    }
    let body: serde_json::Value = response.json().await?;
    Ok(web::Json(body))
}
