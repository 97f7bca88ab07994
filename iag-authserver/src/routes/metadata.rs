//! AS metadata document (RFC 8414)

use actix_web::{get, web, Responder};

use iag_common::AuthorizationServerMetadata;

use crate::AppState;

#[get("/.well-known/oauth-authorization-server")]
pub async fn metadata(state: web::Data<AppState>) -> impl Responder {
    let issuer = state.config.issuer.trim_end_matches('/').to_string();
    web::Json(AuthorizationServerMetadata {
        authorization_endpoint: format!("{issuer}/authorize"),
        token_endpoint: format!("{issuer}/token"),
        introspection_endpoint: Some(format!("{issuer}/introspect")),
        registration_endpoint: Some(format!("{issuer}/register")),
        code_challenge_methods_supported: vec!["S256".into()],
        scopes_supported: state.config.scopes_supported.clone(),
        token_endpoint_auth_methods_supported: vec!["none".into()],
        response_types_supported: vec!["code".into()],
        grant_types_supported: vec!["authorization_code".into()],
        issuer,
    })
}
