//! Per-request obligation enforcement
//!
//! Obligations arrive from the authorizer at session start and are
//! immutable afterwards; updating them means re-authorizing (the TTL
//! forces exactly that). Checks run in a fixed order and the first
//! violation short-circuits: bind_order, max_amount_cents,
//! merchant_allowlist, ttl.

use serde_json::Value;

use iag_common::Obligations;

/// Facts a tool request asserts about itself, pulled from the JSON body
/// first and the query string second.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RequestFacts {
    pub order_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub merchant_id: Option<String>,
}

impl RequestFacts {
    pub fn gather(query: &[(String, String)], body: Option<&Value>) -> Self {
        let from_body = |key: &str| body.and_then(|b| b.get(key)).cloned();
        let from_query = |key: &str| {
            query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| Value::from(v.as_str()))
        };
        let pick = |key: &str| from_body(key).or_else(|| from_query(key));

        Self {
            order_id: pick("orderId").and_then(|v| value_to_string(&v)),
            amount_cents: pick("amount_cents").and_then(|v| value_to_i64(&v)),
            merchant_id: pick("merchant_id").and_then(|v| value_to_string(&v)),
        }
    }
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Outcome of an obligation check that did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObligationBreach {
    /// `403 obligation_violation` with the given detail
    Violation(&'static str),

    /// `401 session_obligation_ttl_expired`; the session token must be
    /// cleared and the user re-authorized
    TtlExpired,
}

/// Runs the ordered checks. `issued_at` is the wall-clock second the
/// obligations were produced by the authorizer.
pub fn enforce(
    obligations: &Obligations,
    issued_at: i64,
    now: i64,
    facts: &RequestFacts,
) -> Result<(), ObligationBreach> {
    if let Some(bound) = &obligations.bind_order {
        if facts.order_id.as_deref() != Some(bound.as_str()) {
            return Err(ObligationBreach::Violation("orderId mismatch"));
        }
    }

    if let Some(max) = obligations.max_amount_cents {
        if facts.amount_cents.is_none_or(|amount| amount > max) {
            return Err(ObligationBreach::Violation("amount exceeds max"));
        }
    }

    if let Some(allowlist) = &obligations.merchant_allowlist {
        let allowed = facts
            .merchant_id
            .as_ref()
            .is_some_and(|m| allowlist.iter().any(|a| a == m));
        if !allowed {
            return Err(ObligationBreach::Violation("merchant not allowed"));
        }
    }

    if let Some(ttl) = obligations.ttl {
        if now - issued_at > ttl {
            return Err(ObligationBreach::TtlExpired);
        }
    }

    Ok(())
}
