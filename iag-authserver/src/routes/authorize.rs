//! Authorization endpoint
//!
//! Validates the client, its redirect URI and the S256 PKCE parameters,
//! auto-approves consent as the demo user, then redirects back with a
//! fresh single-use code. The `state` parameter is opaque here; whatever
//! the client sent is echoed back untouched.

use actix_web::http::header;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use url::Url;

use iag_common::{IagError, Result};

use crate::{new_code, AppState, PendingAuthorization};

#[derive(Debug, Deserialize)]
pub struct AuthorizeQuery {
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub resource: Option<String>,
}

#[get("/authorize")]
pub async fn authorize(
    state: web::Data<AppState>,
    query: web::Query<AuthorizeQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();

    if query.response_type != "code" {
        return Err(IagError::InvalidRequest(
            "response_type must be \"code\"".into(),
        ));
    }

    let known_redirects = {
        let clients = state.clients.read().expect("clients lock poisoned");
        let client = clients
            .get(&query.client_id)
            .ok_or_else(|| IagError::InvalidRequest(format!("unknown client {}", query.client_id)))?;
        client.redirect_uris.clone()
    };
    if !known_redirects.iter().any(|uri| *uri == query.redirect_uri) {
        return Err(IagError::InvalidRequest(
            "redirect_uri is not registered for this client".into(),
        ));
    }

    let code_challenge = query
        .code_challenge
        .filter(|c| !c.is_empty())
        .ok_or_else(|| IagError::InvalidRequest("code_challenge is required".into()))?;
    if query.code_challenge_method.as_deref() != Some("S256") {
        return Err(IagError::InvalidRequest(
            "code_challenge_method must be S256".into(),
        ));
    }

    let scope = query.scope.unwrap_or_default();
    if scope.is_empty() {
        return Err(IagError::InvalidRequest("scope is required".into()));
    }

    // Demo consent: the single configured user approves everything.
    let code = new_code();
    state.codes.lock().expect("codes lock poisoned").insert(
        code.clone(),
        PendingAuthorization {
            client_id: query.client_id.clone(),
            redirect_uri: query.redirect_uri.clone(),
            scope,
            state: query.state.clone(),
            code_challenge,
            resource: query.resource,
        },
    );
    info!(client_id = %query.client_id, "authorization granted");

    let mut location = Url::parse(&query.redirect_uri)
        .map_err(|e| IagError::InvalidRequest(format!("unparseable redirect_uri: {e}")))?;
    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("code", &code);
        if let Some(s) = &query.state {
            pairs.append_pair("state", s);
        }
    }

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location.to_string()))
        .finish())
}
