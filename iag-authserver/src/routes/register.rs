//! Dynamic client registration (RFC 7591)

use actix_web::{post, web, HttpResponse, Responder};
use tracing::info;
use validator::Validate;

use iag_common::{ClientRegistrationRequest, ClientRegistrationResponse, IagError, Result};

use crate::{AppState, RegisteredClient};

#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<ClientRegistrationRequest>,
) -> Result<impl Responder> {
    let request = body.into_inner();
    request
        .validate()
        .map_err(|e| IagError::InvalidRequest(e.to_string()))?;

    let client_id = format!("client-{}", uuid::Uuid::new_v4().simple());
    let client = RegisteredClient {
        client_id: client_id.clone(),
        redirect_uris: request.redirect_uris.clone(),
        client_name: request.client_name.clone(),
    };
    state
        .clients
        .write()
        .expect("clients lock poisoned")
        .insert(client_id.clone(), client);
    info!(%client_id, name = request.client_name.as_deref(), "client registered");

    Ok(HttpResponse::Created().json(ClientRegistrationResponse {
        client_id,
        redirect_uris: request.redirect_uris,
        client_name: request.client_name,
        token_endpoint_auth_method: "none".into(),
    }))
}
