//! # iag-resource: protected demo tools
//!
//! Publishes RFC 9728 protected-resource metadata, challenges
//! unauthenticated callers toward it, and serves three tools behind
//! bearer + audience + scope enforcement: echo, tickets, order payment.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use actix_web::web;

pub use config::Config;
pub use error::{Result, RsError};

pub struct AppState {
    pub config: Config,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

/// Registers every RS route; used by the binary and by tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health::healthz)
        .service(routes::metadata::metadata)
        .service(routes::echo::echo)
        .service(routes::tickets::tickets)
        .service(routes::pay::pay);
}
