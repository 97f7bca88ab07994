//! Authorizer configuration (single env layer)

use std::env;

use iag_common::Result;

#[derive(Clone)]
pub struct Config {
    pub port: u16,

    /// Path of the SQLite delegation store
    pub db_path: String,

    /// Deny evaluation when no delegation exists. The demo default is
    /// `false` (allow with minimal obligations); production wants `true`.
    pub strict: bool,

    /// Obligation TTL in seconds stamped on every allow decision. This is
    /// the canonical source; the gateway never substitutes its own.
    pub obligation_ttl: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env::var("ADP_PORT")
                .unwrap_or_else(|_| "9093".to_string())
                .parse()
                .expect("Invalid ADP_PORT"),
            db_path: env::var("ADP_DB").unwrap_or_else(|_| "iag-adp.db".to_string()),
            strict: env::var("ADP_STRICT")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            obligation_ttl: env::var("ADP_OBLIGATION_TTL")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .expect("Invalid ADP_OBLIGATION_TTL"),
        })
    }
}
