//! Bearer enforcement
//!
//! Every protected handler funnels through [`authorize`]: extract the
//! bearer token, validate it (introspection by default, local HS256 when
//! configured), then check audience and scope. Unauthenticated access
//! gets the RFC 9728 challenge pointing at the metadata document.

use actix_web::HttpRequest;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use iag_common::{IntrospectionResponse, PRM_PATH};

use crate::error::RsError;
use crate::AppState;

/// Who the validated token speaks for.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub sub: String,
    pub scope: String,
}

/// `WWW-Authenticate` value sent with every 401.
pub fn challenge_header(state: &AppState) -> String {
    format!(
        r#"Bearer realm="{aud}", error="invalid_token", error_description="missing or invalid access token", resource_metadata="{base}{path}""#,
        aud = state.config.expected_aud,
        base = state.config.resource.trim_end_matches('/'),
        path = PRM_PATH,
    )
}

/// Claims checked in local-verification mode.
#[derive(Debug, Deserialize)]
struct LocalClaims {
    sub: String,
    scope: String,
    aud: String,
}

pub async fn authorize(
    state: &AppState,
    request: &HttpRequest,
    required_scope: &str,
) -> Result<TokenIdentity, RsError> {
    let challenge = challenge_header(state);

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RsError::Unauthorized {
            code: "invalid_token",
            detail: "missing bearer token".into(),
            challenge: challenge.clone(),
        })?;

    let (sub, scope, aud) = match &state.config.jwt_secret {
        Some(secret) => verify_local(token, secret, &state.config.as_base, &challenge)?,
        None => introspect(state, token, &challenge).await?,
    };

    if aud != state.config.expected_aud {
        return Err(RsError::Unauthorized {
            code: "bad_audience",
            detail: format!("token audience {aud} does not match this resource"),
            challenge,
        });
    }

    if !scope.split_whitespace().any(|s| s == required_scope) {
        return Err(RsError::InsufficientScope {
            required: required_scope.into(),
        });
    }

    Ok(TokenIdentity { sub, scope })
}

fn verify_local(
    token: &str,
    secret: &str,
    issuer: &str,
    challenge: &str,
) -> Result<(String, String, String), RsError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.validate_aud = false;
    validation.leeway = 5;

    let data = decode::<LocalClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| RsError::Unauthorized {
        code: "invalid_token",
        detail: format!("token verification failed: {e}"),
        challenge: challenge.to_string(),
    })?;
    Ok((data.claims.sub, data.claims.scope, data.claims.aud))
}

async fn introspect(
    state: &AppState,
    token: &str,
    challenge: &str,
) -> Result<(String, String, String), RsError> {
    let response = state
        .http
        .post(&state.config.introspect_url)
        .form(&[("token", token)])
        .send()
        .await
        .map_err(|e| RsError::Unauthorized {
            code: "introspection_failed",
            detail: format!("introspection request failed: {e}"),
            challenge: challenge.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(RsError::Unauthorized {
            code: "introspection_failed",
            detail: format!("introspection returned {}", response.status()),
            challenge: challenge.to_string(),
        });
    }

    let introspection: IntrospectionResponse =
        response.json().await.map_err(|e| RsError::Unauthorized {
            code: "introspection_failed",
            detail: format!("unreadable introspection response: {e}"),
            challenge: challenge.to_string(),
        })?;

    if !introspection.active {
        return Err(RsError::Unauthorized {
            code: "invalid_token",
            detail: introspection
                .error
                .unwrap_or_else(|| "token is not active".into()),
            challenge: challenge.to_string(),
        });
    }

    Ok((
        introspection.sub.unwrap_or_default(),
        introspection.scope.unwrap_or_default(),
        introspection.aud.unwrap_or_default(),
    ))
}
