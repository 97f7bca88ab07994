//! Tool endpoints: the obligation-checked reverse proxy
//!
//! Every handler funnels through the same path: pick the ready session
//! whose granted scopes cover the tool, enforce the session's obligations
//! against the concrete request, then forward upstream with the session's
//! bearer token. An upstream 401/403 revokes the session token locally
//! and surfaces as `login_required`.

use std::collections::HashMap;

use actix_web::{get, post, web, HttpResponse};
use serde_json::Value;
use tracing::warn;

use iag_common::{IagError, Result};

use crate::obligations::{self, ObligationBreach, RequestFacts};
use crate::proxy::{self, UpstreamOutcome};
use crate::{now_ts, AppState};

#[get("/mcp/echo")]
pub async fn mcp_echo(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse> {
    handle_tool(&state, "/mcp/echo", query.into_inner(), None).await
}

#[get("/mcp/tickets")]
pub async fn mcp_tickets(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse> {
    handle_tool(&state, "/mcp/tickets", query.into_inner(), None).await
}

#[post("/mcp/pay")]
pub async fn mcp_pay(
    state: web::Data<AppState>,
    query: web::Query<HashMap<String, String>>,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    handle_tool(&state, "/mcp/pay", query.into_inner(), Some(body.into_inner())).await
}

async fn handle_tool(
    state: &AppState,
    gw_path: &str,
    query: HashMap<String, String>,
    body: Option<Value>,
) -> Result<HttpResponse> {
    let route = proxy::route_for_path(gw_path)
        .ok_or_else(|| IagError::InvalidRequest(format!("unknown tool path {gw_path}")))?;
    let query: Vec<(String, String)> = query.into_iter().collect();
    let now = now_ts();

    let session = state
        .sessions
        .select_for_scope(route.required_scope, now)
        .await
        .ok_or(IagError::LoginRequired)?;

    let facts = RequestFacts::gather(&query, body.as_ref());
    match obligations::enforce(&session.obligations, session.obligations_issued_at, now, &facts) {
        Ok(()) => {}
        Err(ObligationBreach::Violation(detail)) => {
            return Err(IagError::ObligationViolation(detail.into()));
        }
        Err(ObligationBreach::TtlExpired) => {
            state.sessions.clear_token(&session.sid).await;
            warn!(sid = %session.sid, "obligation ttl elapsed, session token cleared");
            return Err(IagError::ObligationTtlExpired);
        }
    }

    let url = proxy::upstream_url(route, &session.upstream, &facts)?;

    // For payments the gateway injects the wallet payment-method token it
    // alone holds; the order id travels in the upstream path.
    let body = if route.tool_id == "mcp.pay" {
        let mut value = body.unwrap_or_else(|| Value::Object(Default::default()));
        if let Some(object) = value.as_object_mut() {
            object.insert(
                "payment_method".into(),
                Value::from(state.config.wallet_pm_token.clone()),
            );
            object.remove("orderId");
        }
        Some(value)
    } else {
        body
    };

    let access_token = session.access_token.as_deref().ok_or(IagError::LoginRequired)?;
    match proxy::forward(&state.http, route, &url, &query, body, access_token).await {
        Ok(response) => Ok(response),
        Err(UpstreamOutcome::Denied(status)) => {
            state.sessions.clear_token(&session.sid).await;
            warn!(sid = %session.sid, status, "upstream rejected the token, session reset");
            Err(IagError::LoginRequired)
        }
        Err(UpstreamOutcome::Unreachable(detail)) => Err(IagError::BadGateway(detail)),
    }
}
