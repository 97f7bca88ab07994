//! Policy evaluation
//!
//! Pure decision logic over a (possibly absent) delegation, a request and
//! its context. Handlers fetch the delegation and hand everything in;
//! nothing here touches the store or the clock.

use serde_json::{Map, Value};

use iag_common::{ConsentDecision, ConsentRequest, EvaluateDecision, EvaluateRequest, Obligations};

use crate::store::StoredDelegation;

/// Evaluates scopes and obligations for a session start.
///
/// `strict` is the single switch between deny-without-delegation
/// (production) and allow-with-minimal-obligations (demo).
pub fn evaluate(
    delegation: Option<&StoredDelegation>,
    request: &EvaluateRequest,
    strict: bool,
    obligation_ttl: i64,
) -> EvaluateDecision {
    let bind_order = context_string(&request.context, "orderId");

    let Some(delegation) = delegation else {
        if strict {
            return deny("no delegation for this subject, agent and tool");
        }
        return EvaluateDecision {
            allow: true,
            scopes: request.requested_scopes.clone(),
            obligations: Obligations {
                bind_order,
                ttl: Some(obligation_ttl),
                ..Default::default()
            },
            reason: None,
        };
    };

    if delegation.scopes.is_empty() {
        return deny("delegation grants no scopes");
    }

    let intersection: Vec<String> = request
        .requested_scopes
        .iter()
        .filter(|s| delegation.scopes.contains(s))
        .cloned()
        .collect();
    let scopes = if intersection.is_empty() {
        delegation.scopes.clone()
    } else {
        intersection
    };

    let constraints = delegation.constraints.as_ref();
    if let (Some(max), Some(amount)) = (
        constraints.and_then(|c| c.max_amount_cents),
        context_i64(&request.context, "amount_cents"),
    ) {
        if amount > max {
            return deny("amount exceeds max");
        }
    }
    if let (Some(merchants), Some(merchant)) = (
        constraints.and_then(|c| c.merchants.as_ref()),
        context_string(&request.context, "merchant_id"),
    ) {
        if !merchants.iter().any(|m| *m == merchant) {
            return deny("merchant not allowed");
        }
    }

    EvaluateDecision {
        allow: true,
        scopes,
        obligations: Obligations {
            bind_order,
            max_amount_cents: constraints.and_then(|c| c.max_amount_cents),
            merchant_allowlist: constraints.and_then(|c| c.merchants.clone()),
            ttl: Some(obligation_ttl),
        },
        reason: None,
    }
}

/// Decides whether consent can be granted without showing a page.
pub fn consent(
    delegation: Option<&StoredDelegation>,
    request: &ConsentRequest,
    now: i64,
) -> ConsentDecision {
    let covered = delegation.is_some_and(|d| {
        request
            .scopes
            .iter()
            .all(|scope| d.scopes.contains(scope))
    });

    if covered {
        ConsentDecision {
            allow: true,
            record_id: Some(format!("auto-{now}")),
            reason: None,
        }
    } else if request.explicit {
        ConsentDecision {
            allow: true,
            record_id: Some(format!("exp-{now}")),
            reason: None,
        }
    } else {
        ConsentDecision {
            allow: false,
            record_id: None,
            reason: Some("explicit_required".into()),
        }
    }
}

fn deny(reason: &str) -> EvaluateDecision {
    EvaluateDecision {
        allow: false,
        scopes: vec![],
        obligations: Obligations::default(),
        reason: Some(reason.into()),
    }
}

fn context_string(context: &Map<String, Value>, key: &str) -> Option<String> {
    match context.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn context_i64(context: &Map<String, Value>, key: &str) -> Option<i64> {
    match context.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
