//! # iag-common: shared contracts for the Identity-Aware Gateway
//!
//! Wire types and the error taxonomy used by every IAG service:
//!
//! - **Gateway (GW)**: session orchestration, token custody, obligation
//!   enforcement, reverse proxy
//! - **Authorizer (ADP)**: delegation store + policy evaluation
//! - **Authorization Server (AS)**: authorization code + PKCE issuer
//! - **Resource Server (RS)**: protected tool endpoints
//! - **Agent Client (AC)**: drives sessions through the gateway
//!
//! The agent never sees an upstream access token; it only sees
//! gateway-scoped sessions. Everything in this crate is the glue those
//! five processes speak to each other.

pub mod credential;
pub mod error;
pub mod types;

pub use credential::{jwk_for_ed25519, sign_delegation_eddsa};
pub use error::{IagError, Result};
pub use types::{
    AuthorizationServerMetadata, ClientRegistrationRequest, ClientRegistrationResponse,
    ConsentDecision, ConsentRequest, DelegationClaims, DelegationConstraints, DelegationRecord,
    DelegationUpload, EvaluateDecision, EvaluateRequest, IntrospectionResponse, Obligations,
    ProtectedResourceMetadata, SessionStartRequest, SessionStartResponse, SessionStatusResponse,
    TokenResponse,
};

/// Well-known path for AS metadata (RFC 8414).
pub const AS_METADATA_PATH: &str = "/.well-known/oauth-authorization-server";

/// Well-known path for protected-resource metadata (RFC 9728).
pub const PRM_PATH: &str = "/.well-known/oauth-protected-resource";
