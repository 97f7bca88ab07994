//! # iag-authorizer: delegation store + policy evaluation
//!
//! The ADP decides which scopes and obligations apply to a
//! `(subject, agent, tool, context)` tuple. Users author delegations as
//! compact signed tokens; the gateway asks `/evaluate` before every
//! session start and `/consent` before sending anyone to the AS.

pub mod config;
pub mod jws;
pub mod policy;
pub mod routes;
pub mod store;

use actix_web::web;

pub use config::Config;
use store::DelegationStore;

pub struct AppState {
    pub config: Config,
    pub store: DelegationStore,
}

/// Registers every authorizer route; used by the binary and by tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(routes::health::healthz)
        .service(routes::delegations::submit_delegation)
        .service(routes::delegations::list_delegations)
        .service(routes::evaluate::evaluate)
        .service(routes::consent::consent);
}

/// Wall-clock unix seconds.
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
