//! Gateway configuration (single env layer)

use std::env;

use iag_common::Result;

#[derive(Clone)]
pub struct Config {
    /// Public base URL of this gateway (redirect URIs are derived from it)
    pub gw_base: String,
    pub port: u16,

    /// Base URL of the resource server tool calls are forwarded to
    pub upstream_rs: String,

    /// Fallback protected-resource-metadata URL when the probe fails
    pub rs_meta_fallback: Option<String>,

    /// Base URL of the authorizer
    pub adp_base: String,

    /// HMAC key for the signed state envelope
    pub state_secret: String,

    /// Wallet payment-method token injected into /mcp/pay; held only here
    pub wallet_pm_token: String,

    /// Client id used when the AS offers no dynamic registration
    pub client_id: String,

    /// End-user subject this gateway acts for
    pub subject: String,

    /// Agent identity presented to the authorizer
    pub agent_id: String,

    /// Path probed unauthenticated on the RS during discovery
    pub probe_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            gw_base: env::var("GW_BASE").unwrap_or_else(|_| "http://localhost:9100".to_string()),
            port: env::var("GW_PORT")
                .unwrap_or_else(|_| "9100".to_string())
                .parse()
                .expect("Invalid GW_PORT"),
            upstream_rs: env::var("UPSTREAM_RS")
                .unwrap_or_else(|_| "http://localhost:9091".to_string()),
            rs_meta_fallback: env::var("RS_META").ok(),
            adp_base: env::var("ADP_BASE").unwrap_or_else(|_| "http://localhost:9093".to_string()),
            state_secret: env::var("GW_STATE_SECRET")
                .expect("GW_STATE_SECRET must be set (HMAC key for state signing)"),
            wallet_pm_token: env::var("WALLET_PM_TOKEN")
                .unwrap_or_else(|_| "pm-wallet-demo-0001".to_string()),
            client_id: env::var("GW_CLIENT_ID").unwrap_or_else(|_| "demo-client".to_string()),
            subject: env::var("GW_SUBJECT").unwrap_or_else(|_| "user-123".to_string()),
            agent_id: env::var("GW_AGENT_ID").unwrap_or_else(|_| "agent-demo".to_string()),
            probe_path: env::var("GW_PROBE_PATH").unwrap_or_else(|_| "/mcp/echo".to_string()),
        })
    }
}
