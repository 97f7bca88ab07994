//! Explicit consent surface
//!
//! Used when the authorizer declines auto-consent: `/session/start` then
//! points the user here instead of at the AS. Approval re-asks the
//! authorizer with `explicit=true` and, if granted, hands back the real
//! AS authorize URL for the already-created session.

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use tracing::info;

use iag_common::{ConsentRequest, IagError, Result};

use crate::routes::escape_html;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConsentQuery {
    pub sid: String,
}

#[get("/consent")]
pub async fn consent_page(
    state: web::Data<AppState>,
    query: web::Query<ConsentQuery>,
) -> Result<HttpResponse> {
    let session = state
        .sessions
        .get(&query.sid)
        .await
        .ok_or_else(|| IagError::InvalidRequest("unknown sid".into()))?;

    let body = format!(
        "<!doctype html><html><head><title>Approve agent access</title></head><body>\
         <h1>Approve agent access</h1>\
         <p>An agent asks to use <strong>{tool}</strong> with scopes \
         <code>{scopes}</code>.</p>\
         <button onclick=\"approve()\">Approve</button>\
         <script>\
         async function approve() {{\
           const r = await fetch('/consent/approve', {{method:'POST',\
             headers:{{'Content-Type':'application/json'}},\
             body: JSON.stringify({{sid:'{sid}'}})}});\
           const d = await r.json();\
           if (d.authorize_url) window.location = d.authorize_url;\
         }}\
         </script></body></html>",
        tool = escape_html(&session.tool_id),
        scopes = escape_html(&session.scope_string),
        sid = escape_html(&session.sid),
    );
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub sid: String,
}

#[post("/consent/approve")]
pub async fn consent_approve(
    state: web::Data<AppState>,
    body: web::Json<ApproveRequest>,
) -> Result<impl Responder> {
    let session = state
        .sessions
        .get(&body.sid)
        .await
        .ok_or_else(|| IagError::InvalidRequest("unknown sid".into()))?;

    let decision = state
        .adp
        .consent(&ConsentRequest {
            subject: state.config.subject.clone(),
            agent_id: state.config.agent_id.clone(),
            tool_id: session.tool_id.clone(),
            audience: session.audience.clone(),
            scopes: session.requested_scopes.clone(),
            explicit: true,
        })
        .await?;
    if !decision.allow {
        return Err(IagError::DeniedByPolicy(
            decision
                .reason
                .unwrap_or_else(|| "consent refused".into()),
        ));
    }

    let authorize_url = state.oauth.build_authorize_url(
        &session.as_metadata,
        &session.client_id,
        &session.scope_string,
        &session.state_token,
        &session.pkce_challenge,
        &session.audience,
    )?;
    info!(sid = %session.sid, record_id = decision.record_id.as_deref(), "explicit consent granted");

    Ok(web::Json(serde_json::json!({
        "ok": true,
        "record_id": decision.record_id,
        "authorize_url": authorize_url,
    })))
}
