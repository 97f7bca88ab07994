//! Reverse proxy to the resource server
//!
//! Tool routing is data-driven: a static table maps each gateway path to
//! the scope it requires and the upstream path it forwards to. Session
//! selection is keyed by that scope, never by tool type.

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use reqwest::Method;
use serde_json::Value;

use iag_common::{IagError, Result};

use crate::obligations::RequestFacts;

/// Upstream path shape for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamPath {
    /// Forwarded verbatim
    Fixed(&'static str),

    /// `/orders/{orderId}/pay`; the order id comes from the request facts
    OrderPay,
}

/// HTTP verb a tool uses, both at the gateway and upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolVerb {
    Get,
    Post,
}

impl ToolVerb {
    fn as_method(self) -> Method {
        match self {
            ToolVerb::Get => Method::GET,
            ToolVerb::Post => Method::POST,
        }
    }
}

/// One row of the tool table.
#[derive(Debug, Clone, Copy)]
pub struct ToolRoute {
    pub tool_id: &'static str,
    pub gw_path: &'static str,
    pub required_scope: &'static str,
    pub upstream: UpstreamPath,
    pub method: ToolVerb,
}

/// The static tool → scope → upstream mapping. Holding a session for one
/// row never authorizes a call on another.
pub const TOOL_ROUTES: &[ToolRoute] = &[
    ToolRoute {
        tool_id: "mcp.echo",
        gw_path: "/mcp/echo",
        required_scope: "echo:read",
        upstream: UpstreamPath::Fixed("/mcp/echo"),
        method: ToolVerb::Get,
    },
    ToolRoute {
        tool_id: "mcp.tickets",
        gw_path: "/mcp/tickets",
        required_scope: "tickets:read",
        upstream: UpstreamPath::Fixed("/tickets"),
        method: ToolVerb::Get,
    },
    ToolRoute {
        tool_id: "mcp.pay",
        gw_path: "/mcp/pay",
        required_scope: "payments:charge",
        upstream: UpstreamPath::OrderPay,
        method: ToolVerb::Post,
    },
];

pub fn route_for_path(gw_path: &str) -> Option<&'static ToolRoute> {
    TOOL_ROUTES.iter().find(|r| r.gw_path == gw_path)
}

/// Builds the concrete upstream URL for a route.
pub fn upstream_url(route: &ToolRoute, upstream_base: &str, facts: &RequestFacts) -> Result<String> {
    let base = upstream_base.trim_end_matches('/');
    match route.upstream {
        UpstreamPath::Fixed(path) => Ok(format!("{base}{path}")),
        UpstreamPath::OrderPay => {
            let order_id = facts
                .order_id
                .as_deref()
                .ok_or_else(|| IagError::InvalidRequest("orderId is required".into()))?;
            Ok(format!("{base}/orders/{order_id}/pay"))
        }
    }
}

/// Forwards one authorized tool call upstream and relays the answer.
///
/// The bearer token is injected here and only here; on upstream 401/403
/// the caller must clear the session token (signalled by
/// `UpstreamDenied`). JSON bodies are parsed and re-serialized so
/// upstream header quirks cannot smuggle through.
pub async fn forward(
    http: &reqwest::Client,
    route: &ToolRoute,
    url: &str,
    query: &[(String, String)],
    body: Option<Value>,
    access_token: &str,
) -> std::result::Result<HttpResponse, UpstreamOutcome> {
    let mut request = http
        .request(route.method.as_method(), url)
        .bearer_auth(access_token);
    if !query.is_empty() {
        request = request.query(query);
    }
    if let Some(body) = &body {
        request = request.json(body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| UpstreamOutcome::Unreachable(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(UpstreamOutcome::Denied(status.as_u16()));
    }

    let actix_status =
        StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    if content_type.starts_with("application/json") {
        let value: Value = response
            .json()
            .await
            .map_err(|e| UpstreamOutcome::Unreachable(e.to_string()))?;
        Ok(HttpResponse::build(actix_status).json(value))
    } else {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamOutcome::Unreachable(e.to_string()))?;
        Ok(HttpResponse::build(actix_status)
            .content_type(content_type)
            .body(bytes))
    }
}

/// Why a forward did not produce a relayable response.
#[derive(Debug)]
pub enum UpstreamOutcome {
    /// Upstream rejected the token (401/403); session must be revoked
    Denied(u16),

    /// TCP/HTTP failure talking upstream
    Unreachable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_the_three_tools() {
        assert_eq!(TOOL_ROUTES.len(), 3);
        let echo = route_for_path("/mcp/echo").unwrap();
        assert_eq!(echo.required_scope, "echo:read");
        let tickets = route_for_path("/mcp/tickets").unwrap();
        assert_eq!(tickets.required_scope, "tickets:read");
        let pay = route_for_path("/mcp/pay").unwrap();
        assert_eq!(pay.required_scope, "payments:charge");
        assert!(route_for_path("/mcp/nope").is_none());
    }

    #[test]
    fn fixed_paths_join_cleanly() {
        let echo = route_for_path("/mcp/echo").unwrap();
        let url = upstream_url(echo, "http://localhost:9091/", &RequestFacts::default()).unwrap();
        assert_eq!(url, "http://localhost:9091/mcp/echo");

        let tickets = route_for_path("/mcp/tickets").unwrap();
        let url = upstream_url(tickets, "http://localhost:9091", &RequestFacts::default()).unwrap();
        assert_eq!(url, "http://localhost:9091/tickets");
    }

    #[test]
    fn pay_path_needs_an_order_id() {
        let pay = route_for_path("/mcp/pay").unwrap();
        let facts = RequestFacts {
            order_id: Some("order-1001".into()),
            ..Default::default()
        };
        let url = upstream_url(pay, "http://localhost:9091", &facts).unwrap();
        assert_eq!(url, "http://localhost:9091/orders/order-1001/pay");

        let err = upstream_url(pay, "http://localhost:9091", &RequestFacts::default()).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }
}
