//! OAuth redirect endpoint
//!
//! The browser lands here after the user authorizes at the AS. The signed
//! state is verified in constant time, the session is claimed (replay
//! defense), and the code is exchanged with the PKCE verifier plus the
//! resource indicator. Only a successful exchange marks the session
//! ready; the token itself never appears in any page.

use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

use iag_common::{IagError, Result};

use crate::oauth::DEFAULT_TOKEN_TTL_SECS;
use crate::routes::escape_html;
use crate::{now_ts, AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[get("/oauth/callback")]
pub async fn oauth_callback(
    state: web::Data<AppState>,
    query: web::Query<CallbackQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();

    // AS-reported errors: show them, touch nothing.
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        return Ok(html(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Authorization failed",
            &format!(
                "The authorization server reported <code>{}</code>. {}",
                escape_html(&error),
                escape_html(&description)
            ),
        ));
    }

    let code = query
        .code
        .ok_or_else(|| IagError::InvalidRequest("code is required".into()))?;
    let state_param = query
        .state
        .ok_or_else(|| IagError::InvalidRequest("state is required".into()))?;

    let payload = state.signer.verify(&state_param)?;
    let session = state.sessions.claim_for_exchange(&payload).await?;
    let verifier = session
        .pkce_verifier
        .clone()
        .ok_or_else(|| IagError::Internal("session lost its PKCE verifier".into()))?;

    match state
        .oauth
        .exchange_code(
            &session.as_metadata.token_endpoint,
            &code,
            &session.client_id,
            &verifier,
            &session.audience,
        )
        .await
    {
        Ok(token) => {
            let now = now_ts();
            let expires_at = now + token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
            state
                .sessions
                .finalize(
                    &session.sid,
                    token.access_token,
                    token.refresh_token,
                    expires_at,
                    now,
                )
                .await?;
            info!(sid = %session.sid, "session ready");
            Ok(html(
                actix_web::http::StatusCode::OK,
                "Authorization complete",
                "The agent is now authorized. You can close this tab.",
            ))
        }
        Err(err) => {
            state.sessions.release_claim(&session.sid).await;
            warn!(sid = %session.sid, error = %err, "token exchange failed");
            Ok(html(
                actix_web::http::StatusCode::BAD_GATEWAY,
                "Token exchange failed",
                "The gateway could not redeem the authorization code. Try the flow again.",
            ))
        }
    }
}

fn html(status: actix_web::http::StatusCode, title: &str, body: &str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(format!(
            "<!doctype html><html><head><title>{title}</title></head>\
             <body><h1>{title}</h1><p>{body}</p></body></html>"
        ))
}
