//! Session lifecycle endpoints
//!
//! `POST /session/start` runs the whole start machine: RS discovery, AS
//! resolution, policy evaluation, consent decision, PKCE, state signing,
//! session creation. `GET /session/status` reports readiness and nothing
//! else; the token stays inside the gateway.

use actix_web::{get, post, web, Responder};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use iag_common::{
    ConsentRequest, EvaluateRequest, IagError, Result, SessionStartRequest, SessionStartResponse,
    SessionStatusResponse,
};

use crate::session::{new_nonce, new_sid, Session};
use crate::state_token::{context_digest, StatePayload};
use crate::{now_ts, pkce, AppState};

#[post("/session/start")]
pub async fn session_start(
    state: web::Data<AppState>,
    body: web::Json<SessionStartRequest>,
) -> Result<impl Responder> {
    let request = body.into_inner();
    request
        .validate()
        .map_err(|e| IagError::InvalidRequest(e.to_string()))?;

    // Discovery: probe the RS, follow its challenge to the PRM document,
    // then resolve and fetch the first advertised AS.
    let rs_metadata = state
        .discovery
        .discover_resource(
            &state.config.upstream_rs,
            &state.config.probe_path,
            state.config.rs_meta_fallback.as_deref(),
        )
        .await?;
    let audience = rs_metadata.resource.clone();
    let as_metadata = state.discovery.fetch_as_metadata(&rs_metadata).await?;

    // Policy: which scopes apply, and under which obligations.
    let decision = state
        .adp
        .evaluate(&EvaluateRequest {
            subject: state.config.subject.clone(),
            agent_id: state.config.agent_id.clone(),
            tool_id: request.tool_id.clone(),
            audience: audience.clone(),
            requested_scopes: vec![request.scope.clone()],
            context: request.context.clone(),
        })
        .await?;
    if !decision.allow {
        return Err(IagError::DeniedByPolicy(
            decision
                .reason
                .unwrap_or_else(|| "authorizer refused the requested scopes".into()),
        ));
    }
    let scopes = if decision.scopes.is_empty() {
        vec![request.scope.clone()]
    } else {
        decision.scopes.clone()
    };
    let scope_string = scopes.join(" ");

    // Consent: auto when a delegation covers the scopes, otherwise the
    // user is routed through the gateway's explicit consent page.
    let consent = state
        .adp
        .consent(&ConsentRequest {
            subject: state.config.subject.clone(),
            agent_id: state.config.agent_id.clone(),
            tool_id: request.tool_id.clone(),
            audience: audience.clone(),
            scopes: scopes.clone(),
            explicit: false,
        })
        .await?;

    let client_id = state.oauth.client_id_for(&as_metadata).await?;

    // PKCE pair and the signed state binding this session.
    let verifier = pkce::generate_code_verifier();
    let challenge = pkce::code_challenge_s256(&verifier);
    let sid = new_sid();
    let nonce = new_nonce();
    let now = now_ts();
    let state_token = state.signer.sign(&StatePayload {
        sid: sid.clone(),
        iat: now,
        aud: audience.clone(),
        scope: scope_string.clone(),
        n: nonce.clone(),
        ctx_digest: context_digest(&request.context),
    })?;

    let authorize_url = if consent.allow {
        state.oauth.build_authorize_url(
            &as_metadata,
            &client_id,
            &scope_string,
            &state_token,
            &challenge,
            &audience,
        )?
    } else {
        info!(%sid, reason = consent.reason.as_deref(), "explicit consent required");
        format!(
            "{}/consent?sid={sid}",
            state.config.gw_base.trim_end_matches('/')
        )
    };

    let session = Session {
        sid: sid.clone(),
        nonce,
        tool_id: request.tool_id,
        requested_scopes: scopes,
        scope_string,
        context: request.context,
        rs_metadata,
        as_metadata,
        audience,
        upstream: state.config.upstream_rs.clone(),
        client_id,
        pkce_verifier: Some(verifier),
        pkce_challenge: challenge,
        state_token,
        obligations: decision.obligations,
        obligations_issued_at: now,
        access_token: None,
        refresh_token: None,
        expires_at: None,
        obtained_at: None,
        used: false,
        ready: false,
    };
    state.sessions.insert(session).await;
    info!(%sid, "session created");

    Ok(web::Json(SessionStartResponse { sid, authorize_url }))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub scope: Option<String>,
}

#[get("/session/status")]
pub async fn session_status(
    state: web::Data<AppState>,
    query: web::Query<StatusQuery>,
) -> Result<impl Responder> {
    let now = now_ts();
    let ready = match query.scope.as_deref() {
        Some(scope) => state.sessions.any_ready_for_scope(scope, now).await,
        None => state.sessions.any_ready(now).await,
    };
    Ok(web::Json(SessionStatusResponse { ready }))
}
