//! Authorizer (ADP) client
//!
//! The gateway never decides policy itself: every session start asks the
//! authorizer which scopes apply and which obligations ride along, and
//! whether consent can be granted automatically.

use iag_common::{ConsentDecision, ConsentRequest, EvaluateDecision, EvaluateRequest, IagError, Result};

#[derive(Clone)]
pub struct AdpClient {
    base: String,
    http: reqwest::Client,
}

impl AdpClient {
    pub fn new(base: String, http: reqwest::Client) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub async fn evaluate(&self, request: &EvaluateRequest) -> Result<EvaluateDecision> {
        let url = format!("{}/evaluate", self.base);
        let response = self.http.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(IagError::BadGateway(format!(
                "authorizer /evaluate returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    pub async fn consent(&self, request: &ConsentRequest) -> Result<ConsentDecision> {
        let url = format!("{}/consent", self.base);
        let response = self.http.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(IagError::BadGateway(format!(
                "authorizer /consent returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}
