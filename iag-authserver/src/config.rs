//! Authorization-server configuration (single env layer)

use std::env;

use iag_common::Result;

#[derive(Clone)]
pub struct Config {
    pub port: u16,

    /// Issuer URL; every endpoint lives under it
    pub issuer: String,

    /// HS256 signing secret for issued access tokens
    pub jwt_secret: String,

    /// Audience used when no resource indicator arrives
    pub default_aud: String,

    /// The single demo user this AS "authenticates"
    pub demo_sub: String,

    pub scopes_supported: Vec<String>,

    /// Access-token lifetime, seconds
    pub token_ttl: i64,

    /// Redirect URIs accepted for the pre-seeded demo client
    pub demo_redirect_uris: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env::var("AS_PORT")
                .unwrap_or_else(|_| "9092".to_string())
                .parse()
                .expect("Invalid AS_PORT"),
            issuer: env::var("AS_ISSUER").unwrap_or_else(|_| "http://localhost:9092".to_string()),
            jwt_secret: env::var("AS_JWT_SECRET")
                .unwrap_or_else(|_| "iag-as-demo-secret".to_string()),
            default_aud: env::var("AS_DEFAULT_AUD")
                .unwrap_or_else(|_| "http://localhost:9091".to_string()),
            demo_sub: env::var("AS_DEMO_SUB").unwrap_or_else(|_| "user-123".to_string()),
            scopes_supported: env::var("AS_SCOPES")
                .unwrap_or_else(|_| "echo:read tickets:read payments:charge".to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            token_ttl: 900,
            demo_redirect_uris: env::var("AS_DEMO_REDIRECT_URIS")
                .unwrap_or_else(|_| {
                    "http://localhost:9100/oauth/callback,http://localhost:9200/callback"
                        .to_string()
                })
                .split(',')
                .map(str::to_string)
                .collect(),
        })
    }
}
