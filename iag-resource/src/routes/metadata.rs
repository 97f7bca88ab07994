//! Protected-resource metadata (RFC 9728)

use actix_web::{get, web, Responder};

use iag_common::ProtectedResourceMetadata;

use crate::AppState;

#[get("/.well-known/oauth-protected-resource")]
pub async fn metadata(state: web::Data<AppState>) -> impl Responder {
    let authorization_server = state
        .config
        .as_metadata_url
        .clone()
        .unwrap_or_else(|| state.config.as_base.clone());

    web::Json(ProtectedResourceMetadata {
        resource: state.config.resource.clone(),
        authorization_servers: vec![authorization_server],
        scopes_supported: state.config.scopes_supported.clone(),
        introspection_endpoint: Some(state.config.introspect_url.clone()),
    })
}
