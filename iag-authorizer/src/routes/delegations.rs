//! Delegation intake and listing
//!
//! `POST /delegations` verifies the submitted credential against the
//! accompanying key before anything is stored; the raw envelope is kept
//! for audit. One delegation per `(subject, agent_id, tool_id)`; newer
//! writes upsert.

use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::info;

use iag_common::{DelegationUpload, Result};

use crate::store::StoredDelegation;
use crate::{jws, now_ts, AppState};

#[post("/delegations")]
pub async fn submit_delegation(
    state: web::Data<AppState>,
    body: web::Json<DelegationUpload>,
) -> Result<impl Responder> {
    let upload = body.into_inner();
    let now = now_ts();

    let claims = jws::verify_delegation(&upload.jws, &upload.public_jwk, now)?;
    let expiry = claims.expiry().unwrap_or_default();

    let delegation = StoredDelegation {
        subject: claims.subject,
        agent_id: claims.agent_id,
        tool_id: claims.tool_id,
        scopes: claims.scopes,
        not_after: expiry,
        issuer: claims.iss,
        constraints: claims.constraints,
        jws: upload.jws,
        public_jwk: serde_json::to_string(&upload.public_jwk)?,
    };
    state.store.upsert(&delegation, now).await?;
    info!(
        subject = %delegation.subject,
        agent_id = %delegation.agent_id,
        tool_id = %delegation.tool_id,
        "delegation stored"
    );

    Ok(HttpResponse::Created().json(delegation.as_record()))
}

#[get("/delegations")]
pub async fn list_delegations(state: web::Data<AppState>) -> Result<impl Responder> {
    let records: Vec<_> = state
        .store
        .list()
        .await?
        .iter()
        .map(StoredDelegation::as_record)
        .collect();
    Ok(web::Json(records))
}
