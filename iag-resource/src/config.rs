//! Resource-server configuration (single env layer)

use std::env;

use iag_common::Result;

#[derive(Clone)]
pub struct Config {
    pub port: u16,

    /// Resource identifier; doubles as the expected token audience and
    /// the base of the published metadata URL
    pub resource: String,

    /// Authorization server protecting this resource
    pub as_base: String,

    /// Explicit AS metadata URL to advertise instead of the bare origin
    pub as_metadata_url: Option<String>,

    /// Introspection endpoint tokens are validated against
    pub introspect_url: String,

    /// Audience every token must carry
    pub expected_aud: String,

    /// When set, tokens are verified locally (HS256) instead of via
    /// introspection
    pub jwt_secret: Option<String>,

    pub scopes_supported: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let resource =
            env::var("RS_RESOURCE").unwrap_or_else(|_| "http://localhost:9091".to_string());
        let as_base = env::var("RS_AS_BASE").unwrap_or_else(|_| "http://localhost:9092".to_string());

        Ok(Self {
            port: env::var("RS_PORT")
                .unwrap_or_else(|_| "9091".to_string())
                .parse()
                .expect("Invalid RS_PORT"),
            as_metadata_url: env::var("AS_METADATA_URL").ok(),
            introspect_url: env::var("AUTH_INTROSPECT_URL")
                .unwrap_or_else(|_| format!("{}/introspect", as_base.trim_end_matches('/'))),
            expected_aud: env::var("EXPECTED_AUD").unwrap_or_else(|_| resource.clone()),
            jwt_secret: env::var("RS_JWT_SECRET").ok(),
            scopes_supported: env::var("RS_SCOPES")
                .unwrap_or_else(|_| "echo:read tickets:read payments:charge".to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            resource,
            as_base,
        })
    }
}
