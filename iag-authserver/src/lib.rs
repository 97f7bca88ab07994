//! # iag-authserver: minimal conformant OAuth 2.1 AS
//!
//! Authorization code + PKCE (S256 only), resource indicators (RFC 8707)
//! for audience binding, RFC 7662 introspection, RFC 7591 dynamic client
//! registration, RFC 8414 metadata. Consent is auto-approved for a single
//! demo user; this server exists to give the gateway a real counterparty,
//! not to face the internet.

pub mod config;
pub mod jwt;
pub mod routes;

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use actix_web::web;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;

pub use config::Config;

/// A registered OAuth client. Public; no secret is ever issued.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client_id: String,
    pub redirect_uris: Vec<String>,
    pub client_name: Option<String>,
}

/// One accepted `/authorize` request, keyed by its single-use code.
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,

    /// Opaque to this server; echoed back on redirect
    pub state: Option<String>,

    /// S256 challenge the token request must answer
    pub code_challenge: String,

    /// Resource indicator captured at /authorize
    pub resource: Option<String>,
}

pub struct AppState {
    pub config: Config,
    pub clients: RwLock<HashMap<String, RegisteredClient>>,

    /// Codes are removed on first redemption; lookup+delete is one
    /// operation under this lock.
    pub codes: Mutex<HashMap<String, PendingAuthorization>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let mut clients = HashMap::new();
        // Pre-seeded public client so non-registering callers can run the
        // flow out of the box.
        clients.insert(
            "demo-client".to_string(),
            RegisteredClient {
                client_id: "demo-client".to_string(),
                redirect_uris: config.demo_redirect_uris.clone(),
                client_name: Some("demo client".to_string()),
            },
        );
        Self {
            config,
            clients: RwLock::new(clients),
            codes: Mutex::new(HashMap::new()),
        }
    }
}

/// Fresh random authorization code.
pub fn new_code() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Registers every AS route; used by the binary and by tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health::healthz)
        .service(routes::metadata::metadata)
        .service(routes::register::register)
        .service(routes::authorize::authorize)
        .service(routes::token::token)
        .service(routes::introspect::introspect);
}

/// Wall-clock unix seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
