//! OAuth legwork: client registration, authorize-URL construction, code
//! exchange
//!
//! The gateway is a public client (no secret). When the AS advertises a
//! registration endpoint it registers itself once per issuer and caches
//! the result; otherwise the configured client id is used.

use std::collections::HashMap;

use tokio::sync::RwLock;
use url::Url;

use iag_common::{
    AuthorizationServerMetadata, ClientRegistrationRequest, ClientRegistrationResponse, IagError,
    Result, TokenResponse,
};

/// Default token lifetime assumed when the AS omits `expires_in`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 900;

pub struct OAuthDriver {
    http: reqwest::Client,
    redirect_uri: String,
    fallback_client_id: String,

    /// issuer → registered client_id
    registered: RwLock<HashMap<String, String>>,
}

impl OAuthDriver {
    pub fn new(http: reqwest::Client, gw_base: &str, fallback_client_id: String) -> Self {
        Self {
            http,
            redirect_uri: format!("{}/oauth/callback", gw_base.trim_end_matches('/')),
            fallback_client_id,
            registered: RwLock::new(HashMap::new()),
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Client id to use against this AS. Dynamic registration (RFC 7591)
    /// when advertised, cached per issuer; configured fallback otherwise.
    pub async fn client_id_for(&self, as_meta: &AuthorizationServerMetadata) -> Result<String> {
        let Some(registration_endpoint) = as_meta.registration_endpoint.as_deref() else {
            return Ok(self.fallback_client_id.clone());
        };

        if let Some(cached) = self.registered.read().await.get(&as_meta.issuer) {
            return Ok(cached.clone());
        }

        let request = ClientRegistrationRequest {
            redirect_uris: vec![self.redirect_uri.clone()],
            client_name: Some("iag-gateway".into()),
        };
        let response = self
            .http
            .post(registration_endpoint)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(IagError::StartFailed(format!(
                "client registration at {registration_endpoint} returned {}",
                response.status()
            )));
        }
        let registered: ClientRegistrationResponse = response.json().await?;

        self.registered
            .write()
            .await
            .insert(as_meta.issuer.clone(), registered.client_id.clone());
        tracing::info!(issuer = %as_meta.issuer, client_id = %registered.client_id, "registered with AS");
        Ok(registered.client_id)
    }

    /// Authorization URL sending the user to the AS. Always carries the
    /// PKCE challenge, the signed state, and the resource indicator.
    pub fn build_authorize_url(
        &self,
        as_meta: &AuthorizationServerMetadata,
        client_id: &str,
        scope: &str,
        state_token: &str,
        code_challenge: &str,
        audience: &str,
    ) -> Result<String> {
        let mut url = Url::parse(&as_meta.authorization_endpoint)
            .map_err(|e| IagError::StartFailed(format!("bad authorization_endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", scope)
            .append_pair("state", state_token)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("resource", audience);
        Ok(url.into())
    }

    /// Exchanges an authorization code for a token (form POST, PKCE
    /// verifier, resource indicator repeated for audience binding).
    pub async fn exchange_code(
        &self,
        token_endpoint: &str,
        code: &str,
        client_id: &str,
        code_verifier: &str,
        audience: &str,
    ) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", client_id),
            ("code_verifier", code_verifier),
            ("resource", audience),
        ];

        let response = self.http.post(token_endpoint).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(IagError::BadGateway(format!(
                "token exchange returned {status}"
            )));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_meta() -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: "http://localhost:9092".into(),
            authorization_endpoint: "http://localhost:9092/authorize".into(),
            token_endpoint: "http://localhost:9092/token".into(),
            introspection_endpoint: None,
            registration_endpoint: None,
            code_challenge_methods_supported: vec!["S256".into()],
            scopes_supported: vec![],
            token_endpoint_auth_methods_supported: vec!["none".into()],
            response_types_supported: vec!["code".into()],
            grant_types_supported: vec!["authorization_code".into()],
        }
    }

    fn driver() -> OAuthDriver {
        OAuthDriver::new(
            reqwest::Client::new(),
            "http://localhost:9100",
            "demo-client".into(),
        )
    }

    #[test]
    fn authorize_url_carries_every_required_parameter() {
        let url = driver()
            .build_authorize_url(
                &as_meta(),
                "demo-client",
                "echo:read",
                "signed.state",
                "challenge123",
                "http://localhost:9091",
            )
            .unwrap();

        let parsed = Url::parse(&url).unwrap();
        let pairs: HashMap<_, _> = parsed.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "demo-client");
        assert_eq!(pairs["redirect_uri"], "http://localhost:9100/oauth/callback");
        assert_eq!(pairs["scope"], "echo:read");
        assert_eq!(pairs["state"], "signed.state");
        assert_eq!(pairs["code_challenge"], "challenge123");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["resource"], "http://localhost:9091");
    }

    #[tokio::test]
    async fn falls_back_to_configured_client_id_without_registration_endpoint() {
        let client_id = driver().client_id_for(&as_meta()).await.unwrap();
        assert_eq!(client_id, "demo-client");
    }
}
