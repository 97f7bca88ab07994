//! RS and AS discovery
//!
//! The gateway learns where to send the user by probing the RS without
//! credentials: the `401` challenge carries a `resource_metadata` URL
//! (RFC 9728), whose document names the authorization servers (RFC 8414).

use reqwest::StatusCode;
use url::Url;

use iag_common::{
    AuthorizationServerMetadata, IagError, ProtectedResourceMetadata, Result, AS_METADATA_PATH,
};

/// Pulls the `resource_metadata="<url>"` parameter out of a
/// `WWW-Authenticate: Bearer ...` challenge.
pub fn extract_resource_metadata_url(header: &str) -> Option<String> {
    let rest = header.split("resource_metadata=\"").nth(1)?;
    let url = rest.split('"').next()?;
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Normalizes an `authorization_servers` entry to a fetchable metadata URL:
/// entries already ending in the well-known path pass through, anything
/// else resolves to `<origin>/.well-known/oauth-authorization-server`.
pub fn normalize_as_metadata_url(entry: &str) -> Result<String> {
    if entry.ends_with(AS_METADATA_PATH) {
        return Ok(entry.to_string());
    }
    let url = Url::parse(entry)
        .map_err(|e| IagError::StartFailed(format!("bad authorization server URL {entry}: {e}")))?;
    Ok(format!("{}{}", url.origin().ascii_serialization(), AS_METADATA_PATH))
}

/// Discovery client over the gateway's shared HTTP connection pool.
#[derive(Clone)]
pub struct DiscoveryClient {
    http: reqwest::Client,
}

impl DiscoveryClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Probes the RS unauthenticated and fetches its protected-resource
    /// metadata. When the probe yields nothing usable, the configured
    /// fallback metadata URL is consulted; only if both fail does the
    /// session start fail.
    pub async fn discover_resource(
        &self,
        upstream: &str,
        probe_path: &str,
        fallback_meta_url: Option<&str>,
    ) -> Result<ProtectedResourceMetadata> {
        match self.probe(upstream, probe_path).await {
            Ok(meta) => Ok(meta),
            Err(probe_err) => {
                let Some(fallback) = fallback_meta_url else {
                    return Err(probe_err);
                };
                tracing::warn!(error = %probe_err, fallback, "RS probe failed, using fallback metadata URL");
                self.fetch_prm(fallback).await.map_err(|fallback_err| {
                    IagError::StartFailed(format!(
                        "probe failed ({probe_err}); fallback failed ({fallback_err})"
                    ))
                })
            }
        }
    }

    async fn probe(&self, upstream: &str, probe_path: &str) -> Result<ProtectedResourceMetadata> {
        let probe_url = format!(
            "{}/{}",
            upstream.trim_end_matches('/'),
            probe_path.trim_start_matches('/')
        );
        let response = self.http.get(&probe_url).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Err(IagError::StartFailed(format!(
                "expected 401 from unauthenticated probe of {probe_url}, got {}",
                response.status()
            )));
        }

        let challenge = response
            .headers()
            .get("WWW-Authenticate")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                IagError::StartFailed(format!("no WWW-Authenticate challenge from {probe_url}"))
            })?;

        let meta_url = extract_resource_metadata_url(challenge).ok_or_else(|| {
            IagError::StartFailed("challenge carries no resource_metadata URL".into())
        })?;

        self.fetch_prm(&meta_url).await
    }

    async fn fetch_prm(&self, url: &str) -> Result<ProtectedResourceMetadata> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(IagError::StartFailed(format!(
                "resource metadata fetch from {url} returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Resolves and fetches metadata for the first advertised AS.
    pub async fn fetch_as_metadata(
        &self,
        rs_meta: &ProtectedResourceMetadata,
    ) -> Result<AuthorizationServerMetadata> {
        let entry = rs_meta.authorization_servers.first().ok_or_else(|| {
            IagError::StartFailed("resource metadata lists no authorization servers".into())
        })?;
        let meta_url = normalize_as_metadata_url(entry)?;

        let response = self.http.get(&meta_url).send().await?;
        if !response.status().is_success() {
            return Err(IagError::StartFailed(format!(
                "AS metadata fetch from {meta_url} returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_resource_metadata_from_challenge() {
        let header = r#"Bearer realm="http://localhost:9091", error="invalid_token", error_description="missing token", resource_metadata="http://localhost:9091/.well-known/oauth-protected-resource""#;
        assert_eq!(
            extract_resource_metadata_url(header).as_deref(),
            Some("http://localhost:9091/.well-known/oauth-protected-resource")
        );
    }

    #[test]
    fn missing_resource_metadata_yields_none() {
        assert!(extract_resource_metadata_url(r#"Bearer realm="x""#).is_none());
        assert!(extract_resource_metadata_url("").is_none());
        assert!(extract_resource_metadata_url(r#"Bearer resource_metadata="""#).is_none());
    }

    #[test]
    fn normalizes_bare_origin_to_well_known() {
        assert_eq!(
            normalize_as_metadata_url("http://localhost:9092").unwrap(),
            "http://localhost:9092/.well-known/oauth-authorization-server"
        );
        // a path on the entry is dropped in favor of the origin
        assert_eq!(
            normalize_as_metadata_url("http://localhost:9092/oauth").unwrap(),
            "http://localhost:9092/.well-known/oauth-authorization-server"
        );
    }

    #[test]
    fn keeps_explicit_metadata_urls() {
        let explicit = "http://localhost:9092/.well-known/oauth-authorization-server";
        assert_eq!(normalize_as_metadata_url(explicit).unwrap(), explicit);
    }

    #[test]
    fn rejects_unparseable_entries() {
        assert!(normalize_as_metadata_url("not a url").is_err());
    }
}
