//! Gateway client
//!
//! The agent only ever talks to the gateway: start a session, hand the
//! authorize URL to a browser (or drive it directly against the demo AS,
//! which auto-approves), poll readiness, call the tool. No OAuth token is
//! ever visible here.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde_json::{json, Map, Value};

use iag_common::{SessionStartResponse, SessionStatusResponse};

/// How often readiness is polled.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct GatewayClient {
    base: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base: &str) -> Result<Self> {
        // Redirects stay manual so the AS's Location header can be walked
        // explicitly.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn start_session(
        &self,
        tool_id: &str,
        scope: &str,
        context: Map<String, Value>,
    ) -> Result<SessionStartResponse> {
        let response = self
            .http
            .post(format!("{}/session/start", self.base))
            .json(&json!({ "tool_id": tool_id, "scope": scope, "context": context }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("session start failed ({status}): {body}");
        }
        Ok(response.json().await?)
    }

    /// Walks the browser leg without a browser: approve on the gateway's
    /// consent page if that is where the URL points, follow the AS
    /// redirect, land on the gateway callback.
    pub async fn drive_authorization(&self, authorize_url: &str, sid: &str) -> Result<()> {
        let mut url = authorize_url.to_string();

        if url.contains("/consent?") {
            tracing::info!("explicit consent required, approving");
            let response = self
                .http
                .post(format!("{}/consent/approve", self.base))
                .json(&json!({ "sid": sid }))
                .send()
                .await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                bail!("consent approval failed ({status}): {body}");
            }
            let approved: Value = response.json().await?;
            url = approved["authorize_url"]
                .as_str()
                .context("approval response carries no authorize_url")?
                .to_string();
        }

        let response = self.http.get(&url).send().await?;
        if response.status() != reqwest::StatusCode::FOUND {
            bail!(
                "authorization endpoint answered {} instead of a redirect",
                response.status()
            );
        }
        let callback_url = response
            .headers()
            .get("Location")
            .and_then(|h| h.to_str().ok())
            .context("redirect without Location header")?
            .to_string();

        let callback = self.http.get(&callback_url).send().await?;
        if !callback.status().is_success() {
            bail!("gateway callback failed: {}", callback.status());
        }
        Ok(())
    }

    /// Polls `/session/status` until the scope is served or the ceiling
    /// elapses; past it the session is abandoned.
    pub async fn wait_ready(&self, scope: &str, ceiling: Duration) -> Result<()> {
        let deadline = Instant::now() + ceiling;
        loop {
            let status: SessionStatusResponse = self
                .http
                .get(format!("{}/session/status", self.base))
                .query(&[("scope", scope)])
                .send()
                .await?
                .json()
                .await?;
            if status.ready {
                return Ok(());
            }
            if Instant::now() + POLL_INTERVAL > deadline {
                bail!(
                    "session for {scope} not ready within {}s, abandoning",
                    ceiling.as_secs()
                );
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn get_tool(&self, path: &str, query: &[(&str, &str)]) -> Result<(u16, Value)> {
        let response = self
            .http
            .get(format!("{}{path}", self.base))
            .query(query)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn post_tool(&self, path: &str, body: Value) -> Result<(u16, Value)> {
        let response = self
            .http
            .post(format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}
