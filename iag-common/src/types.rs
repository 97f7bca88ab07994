//! Wire types shared by the IAG services
//!
//! Metadata documents follow their RFCs (9728 for protected resources,
//! 8414 for AS metadata, 7662 for introspection, 7591 for registration);
//! the evaluate/consent contracts are the gateway↔authorizer protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Protected-resource metadata (RFC 9728), published by the RS at
/// `/.well-known/oauth-protected-resource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Resource identifier; becomes the token audience
    pub resource: String,

    /// Authorization servers that protect this resource
    pub authorization_servers: Vec<String>,

    #[serde(default)]
    pub scopes_supported: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,
}

/// Authorization-server metadata (RFC 8414).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,

    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,

    #[serde(default)]
    pub scopes_supported: Vec<String>,

    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Vec<String>,

    #[serde(default)]
    pub response_types_supported: Vec<String>,

    #[serde(default)]
    pub grant_types_supported: Vec<String>,
}

/// Token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Introspection response (RFC 7662).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dynamic client registration request (RFC 7591).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientRegistrationRequest {
    #[validate(length(min = 1))]
    pub redirect_uris: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

/// Dynamic client registration response. Public clients only; no secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistrationResponse {
    pub client_id: String,
    pub redirect_uris: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    pub token_endpoint_auth_method: String,
}

/// Run-time constraints attached to a session by the authorizer and
/// enforced by the gateway before every upstream forward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Obligations {
    /// Requests must reference exactly this order identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_order: Option<String>,

    /// Requested `amount_cents` must not exceed this
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount_cents: Option<i64>,

    /// Requested `merchant_id` must be one of these
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_allowlist: Option<Vec<String>>,

    /// Seconds the obligations stay valid; past that the session must
    /// re-authorize
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

impl Obligations {
    pub fn is_empty(&self) -> bool {
        self.bind_order.is_none()
            && self.max_amount_cents.is_none()
            && self.merchant_allowlist.is_none()
            && self.ttl.is_none()
    }
}

/// Gateway → authorizer policy evaluation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub subject: String,
    pub agent_id: String,
    pub tool_id: String,

    /// Resource identifier from RS metadata
    pub audience: String,

    pub requested_scopes: Vec<String>,

    #[serde(default)]
    pub context: Map<String, Value>,
}

/// Authorizer policy decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateDecision {
    pub allow: bool,

    /// Scopes the gateway should actually request (may narrow the ask)
    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub obligations: Obligations,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Gateway → authorizer consent check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub subject: String,
    pub agent_id: String,
    pub tool_id: String,
    pub audience: String,
    pub scopes: Vec<String>,

    /// True once the user pressed approve on the gateway's consent page
    pub explicit: bool,
}

/// Authorizer consent decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentDecision {
    pub allow: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Optional bounds a user puts on a delegation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct DelegationConstraints {
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount_cents: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchants: Option<Vec<String>>,
}

/// Claims of a delegation credential: a signed statement by `subject`
/// authorizing `agent_id` to exercise `scopes` on `tool_id`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DelegationClaims {
    #[validate(length(min = 1))]
    pub subject: String,

    #[validate(length(min = 1))]
    pub agent_id: String,

    #[validate(length(min = 1))]
    pub tool_id: String,

    #[validate(length(min = 1))]
    pub scopes: Vec<String>,

    /// Absolute expiry, unix seconds. `exp` is accepted as an alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[validate(length(min = 1))]
    pub iss: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub constraints: Option<DelegationConstraints>,
}

impl DelegationClaims {
    /// Expiry instant; `not_after` wins over `exp` when both are present.
    pub fn expiry(&self) -> Option<i64> {
        self.not_after.or(self.exp)
    }
}

/// Upload body for `POST /delegations`: the compact signed token plus the
/// key that verifies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationUpload {
    pub jws: String,
    pub public_jwk: Value,
}

/// Stored-delegation view returned by `GET /delegations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub subject: String,
    pub agent_id: String,
    pub tool_id: String,
    pub scopes: Vec<String>,
    pub not_after: i64,
    pub issuer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<DelegationConstraints>,
}

/// Agent → gateway session start.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionStartRequest {
    #[validate(length(min = 1))]
    pub tool_id: String,

    #[validate(length(min = 1))]
    pub scope: String,

    #[serde(default)]
    pub context: Map<String, Value>,
}

/// Gateway reply to a session start. The agent opens `authorize_url` in a
/// browser; the token that eventually results never leaves the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartResponse {
    pub sid: String,
    pub authorize_url: String,
}

/// Gateway session readiness. Deliberately carries nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub ready: bool,
}
