//! Introspection endpoint (RFC 7662)
//!
//! Accepts the token from the form body or from a bearer header. Bad or
//! expired tokens yield `{active: false, error}` with 200, per the RFC's
//! shape; only a missing token is a caller error.

use actix_web::{post, web, HttpRequest, Responder};
use serde::Deserialize;

use iag_common::{IagError, IntrospectionResponse, Result};

use crate::{jwt, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct IntrospectForm {
    pub token: Option<String>,
}

#[post("/introspect")]
pub async fn introspect(
    state: web::Data<AppState>,
    request: HttpRequest,
    form: Option<web::Form<IntrospectForm>>,
) -> Result<impl Responder> {
    let bearer = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    let token = form
        .and_then(|f| f.into_inner().token)
        .or(bearer)
        .ok_or_else(|| IagError::InvalidRequest("token is required".into()))?;

    let response = match jwt::verify(&token, &state.config.jwt_secret, &state.config.issuer) {
        Ok(claims) => IntrospectionResponse {
            active: true,
            scope: Some(claims.scope),
            sub: Some(claims.sub),
            aud: Some(claims.aud),
            iss: Some(claims.iss),
            iat: Some(claims.iat),
            exp: Some(claims.exp),
            token_type: Some("access_token".into()),
            error: None,
        },
        Err(error) => IntrospectionResponse {
            active: false,
            error: Some(error),
            ..Default::default()
        },
    };

    Ok(web::Json(response))
}
