//! # iag-gateway: the Identity-Aware Gateway
//!
//! Mediates every agent-to-tool call. The gateway terminates end-user
//! OAuth sessions on the agent's behalf: it discovers the RS and its AS,
//! asks the authorizer which scopes and obligations apply, drives
//! Authorization Code + PKCE, keeps the access token server-side, and
//! forwards authorized requests upstream with per-request obligation
//! enforcement. Agents only ever see gateway-scoped sessions.

pub mod config;
pub mod discovery;
pub mod oauth;
pub mod obligations;
pub mod pkce;
pub mod policy;
pub mod proxy;
pub mod routes;
pub mod session;
pub mod state_token;

use actix_web::web;

pub use config::Config;

use discovery::DiscoveryClient;
use oauth::OAuthDriver;
use policy::AdpClient;
use session::SessionStore;
use state_token::StateSigner;

/// Shared per-process state handed to every handler.
pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
    pub sessions: SessionStore,
    pub signer: StateSigner,
    pub discovery: DiscoveryClient,
    pub adp: AdpClient,
    pub oauth: OAuthDriver,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let http = reqwest::Client::new();
        Self {
            signer: StateSigner::new(&config.state_secret),
            sessions: SessionStore::new(),
            discovery: DiscoveryClient::new(http.clone()),
            adp: AdpClient::new(config.adp_base.clone(), http.clone()),
            oauth: OAuthDriver::new(http.clone(), &config.gw_base, config.client_id.clone()),
            http,
            config,
        }
    }
}

/// Registers every gateway route; used by the binary and by tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health::healthz)
        .service(routes::session::session_start)
        .service(routes::session::session_status)
        .service(routes::callback::oauth_callback)
        .service(routes::consent::consent_page)
        .service(routes::consent::consent_approve)
        .service(routes::tools::mcp_echo)
        .service(routes::tools::mcp_tickets)
        .service(routes::tools::mcp_pay)
        .service(routes::debug::session_reset)
        .service(routes::debug::debug_token)
        .service(routes::debug::debug_introspect);
}

/// Wall-clock unix seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
