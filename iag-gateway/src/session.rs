//! Gateway session table
//!
//! Sessions are the credential firewall: the upstream access token lives
//! here and nowhere else. The table is the single source of truth within
//! the process; finalization of a session is atomic with respect to tool
//! handlers reading it, so a reader sees either `ready == false` or a
//! fully consistent token snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use iag_common::{
    AuthorizationServerMetadata, IagError, Obligations, ProtectedResourceMetadata, Result,
};

use crate::state_token::StatePayload;

/// One user-authorized capability grant.
#[derive(Debug, Clone)]
pub struct Session {
    pub sid: String,
    pub nonce: String,

    pub tool_id: String,
    pub requested_scopes: Vec<String>,
    pub scope_string: String,
    pub context: Map<String, Value>,

    /// Discovery documents, immutable for the session lifetime
    pub rs_metadata: ProtectedResourceMetadata,
    pub as_metadata: AuthorizationServerMetadata,

    /// Resource identifier from RS metadata; the token audience
    pub audience: String,

    /// RS base URL tool calls are forwarded to
    pub upstream: String,

    pub client_id: String,

    /// Erased after a successful token exchange
    pub pkce_verifier: Option<String>,
    pub pkce_challenge: String,

    pub state_token: String,

    /// Immutable once written; refreshing them means a new authorization
    pub obligations: Obligations,
    pub obligations_issued_at: i64,

    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub obtained_at: Option<i64>,

    /// Set once the authorization code has been exchanged
    pub used: bool,
    pub ready: bool,
}

impl Session {
    /// A session serves tool traffic iff it holds a token, its code has
    /// been exchanged, and the token has not expired.
    pub fn is_ready(&self, now: i64) -> bool {
        self.ready
            && self.used
            && self.access_token.is_some()
            && self.expires_at.is_some_and(|exp| exp > now)
    }
}

/// Random 128-bit session identifier.
pub fn new_sid() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Random nonce bound into the signed state.
pub fn new_nonce() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Concurrency-safe session table keyed by `sid`.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        self.inner.write().await.insert(session.sid.clone(), session);
    }

    /// Snapshot of one session.
    pub async fn get(&self, sid: &str) -> Option<Session> {
        self.inner.read().await.get(sid).cloned()
    }

    /// Validates a verified callback against the stored session and claims
    /// it for exchange, all under one write lock. Rejects unknown sessions,
    /// replays (`used`), and aud/scope drift between envelope and session.
    pub async fn claim_for_exchange(&self, state: &StatePayload) -> Result<Session> {
        let mut table = self.inner.write().await;
        let session = table
            .get_mut(&state.sid)
            .ok_or_else(|| IagError::BadState("unknown session".into()))?;

        if session.used {
            return Err(IagError::BadState("session already used".into()));
        }
        if session.audience != state.aud || session.scope_string != state.scope {
            return Err(IagError::BadState(
                "state does not match session".into(),
            ));
        }
        if session.nonce != state.n
            || crate::state_token::context_digest(&session.context) != state.ctx_digest
        {
            return Err(IagError::BadState("state does not match session".into()));
        }

        session.used = true;
        Ok(session.clone())
    }

    /// Reopens a claimed session after a failed token exchange.
    pub async fn release_claim(&self, sid: &str) {
        if let Some(session) = self.inner.write().await.get_mut(sid) {
            session.used = false;
        }
    }

    /// Atomically stores the exchanged token and marks the session ready.
    /// The PKCE verifier is erased here; it has no further use.
    pub async fn finalize(
        &self,
        sid: &str,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: i64,
        now: i64,
    ) -> Result<()> {
        let mut table = self.inner.write().await;
        let session = table
            .get_mut(sid)
            .ok_or_else(|| IagError::Internal(format!("session {sid} vanished")))?;

        session.access_token = Some(access_token);
        session.refresh_token = refresh_token;
        session.expires_at = Some(expires_at);
        session.obtained_at = Some(now);
        session.pkce_verifier = None;
        session.used = true;
        session.ready = true;
        Ok(())
    }

    /// Revokes a session's token locally (obligation TTL expiry, upstream
    /// 401/403). The session stays in the table but stops serving traffic.
    pub async fn clear_token(&self, sid: &str) {
        if let Some(session) = self.inner.write().await.get_mut(sid) {
            session.access_token = None;
            session.ready = false;
        }
    }

    /// Selects the session serving `scope`: ready, token present, scope
    /// granted; ties broken by most recent `obtained_at`, then `sid` so the
    /// choice is deterministic per process.
    pub async fn select_for_scope(&self, scope: &str, now: i64) -> Option<Session> {
        self.inner
            .read()
            .await
            .values()
            .filter(|s| s.is_ready(now) && s.requested_scopes.iter().any(|sc| sc == scope))
            .max_by(|a, b| {
                a.obtained_at
                    .cmp(&b.obtained_at)
                    .then_with(|| a.sid.cmp(&b.sid))
            })
            .cloned()
    }

    /// True when any ready session covers `scope`.
    pub async fn any_ready_for_scope(&self, scope: &str, now: i64) -> bool {
        self.select_for_scope(scope, now).await.is_some()
    }

    /// True when any session at all is ready.
    pub async fn any_ready(&self, now: i64) -> bool {
        self.inner.read().await.values().any(|s| s.is_ready(now))
    }

    /// Drops every session. Returns how many were removed.
    pub async fn reset(&self) -> usize {
        let mut table = self.inner.write().await;
        let n = table.len();
        table.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session(sid: &str, scope: &str) -> Session {
        Session {
            sid: sid.into(),
            nonce: "n".into(),
            tool_id: "mcp.echo".into(),
            requested_scopes: vec![scope.into()],
            scope_string: scope.into(),
            context: Map::new(),
            rs_metadata: ProtectedResourceMetadata {
                resource: "http://localhost:9091".into(),
                authorization_servers: vec!["http://localhost:9092".into()],
                scopes_supported: vec![],
                introspection_endpoint: None,
            },
            as_metadata: AuthorizationServerMetadata {
                issuer: "http://localhost:9092".into(),
                authorization_endpoint: "http://localhost:9092/authorize".into(),
                token_endpoint: "http://localhost:9092/token".into(),
                introspection_endpoint: None,
                registration_endpoint: None,
                code_challenge_methods_supported: vec!["S256".into()],
                scopes_supported: vec![],
                token_endpoint_auth_methods_supported: vec!["none".into()],
                response_types_supported: vec!["code".into()],
                grant_types_supported: vec!["authorization_code".into()],
            },
            audience: "http://localhost:9091".into(),
            upstream: "http://localhost:9091".into(),
            client_id: "demo-client".into(),
            pkce_verifier: Some("verifier".into()),
            pkce_challenge: "challenge".into(),
            state_token: "state".into(),
            obligations: Obligations::default(),
            obligations_issued_at: 0,
            access_token: None,
            refresh_token: None,
            expires_at: None,
            obtained_at: None,
            used: false,
            ready: false,
        }
    }

    fn state_for(session: &Session) -> StatePayload {
        StatePayload {
            sid: session.sid.clone(),
            iat: 0,
            aud: session.audience.clone(),
            scope: session.scope_string.clone(),
            n: session.nonce.clone(),
            ctx_digest: crate::state_token::context_digest(&session.context),
        }
    }

    #[tokio::test]
    async fn finalize_makes_session_ready_and_erases_verifier() {
        let store = SessionStore::new();
        let session = test_session("s1", "echo:read");
        let state = state_for(&session);
        store.insert(session).await;

        store.claim_for_exchange(&state).await.unwrap();
        store
            .finalize("s1", "tok".into(), None, 1000, 100)
            .await
            .unwrap();

        let s = store.get("s1").await.unwrap();
        assert!(s.is_ready(100));
        assert!(s.pkce_verifier.is_none());
        assert_eq!(s.obtained_at, Some(100));
    }

    #[tokio::test]
    async fn claim_rejects_replay_and_mismatch() {
        let store = SessionStore::new();
        let session = test_session("s1", "echo:read");
        let state = state_for(&session);
        store.insert(session).await;

        store.claim_for_exchange(&state).await.unwrap();
        // second claim: session already used
        let err = store.claim_for_exchange(&state).await.unwrap_err();
        assert!(err.detail().contains("used"));

        let other = test_session("s2", "echo:read");
        let mut drifted = state_for(&other);
        drifted.scope = "payments:charge".into();
        store.insert(other).await;
        let err = store.claim_for_exchange(&drifted).await.unwrap_err();
        assert!(err.detail().contains("match"));
    }

    #[tokio::test]
    async fn release_claim_reopens_the_session() {
        let store = SessionStore::new();
        let session = test_session("s1", "echo:read");
        let state = state_for(&session);
        store.insert(session).await;

        store.claim_for_exchange(&state).await.unwrap();
        store.release_claim("s1").await;
        assert!(store.claim_for_exchange(&state).await.is_ok());
    }

    #[tokio::test]
    async fn selection_is_scope_segregated() {
        let store = SessionStore::new();
        for (sid, scope) in [("t1", "tickets:read"), ("p1", "payments:charge")] {
            let session = test_session(sid, scope);
            let state = state_for(&session);
            store.insert(session).await;
            store.claim_for_exchange(&state).await.unwrap();
            store
                .finalize(sid, format!("tok-{sid}"), None, 1000, 100)
                .await
                .unwrap();
        }

        let tickets = store.select_for_scope("tickets:read", 100).await.unwrap();
        assert_eq!(tickets.sid, "t1");
        let pay = store.select_for_scope("payments:charge", 100).await.unwrap();
        assert_eq!(pay.sid, "p1");
        assert!(store.select_for_scope("echo:read", 100).await.is_none());
    }

    #[tokio::test]
    async fn selection_prefers_most_recent_token() {
        let store = SessionStore::new();
        for (sid, obtained) in [("old", 100), ("new", 200)] {
            let session = test_session(sid, "echo:read");
            let state = state_for(&session);
            store.insert(session).await;
            store.claim_for_exchange(&state).await.unwrap();
            store
                .finalize(sid, "tok".into(), None, 10_000, obtained)
                .await
                .unwrap();
        }
        let chosen = store.select_for_scope("echo:read", 300).await.unwrap();
        assert_eq!(chosen.sid, "new");
    }

    #[tokio::test]
    async fn expired_or_cleared_sessions_do_not_serve() {
        let store = SessionStore::new();
        let session = test_session("s1", "echo:read");
        let state = state_for(&session);
        store.insert(session).await;
        store.claim_for_exchange(&state).await.unwrap();
        store
            .finalize("s1", "tok".into(), None, 150, 100)
            .await
            .unwrap();

        // token expired at 150
        assert!(store.select_for_scope("echo:read", 200).await.is_none());

        // cleared token
        store.finalize("s1", "tok".into(), None, 1000, 100).await.unwrap();
        store.clear_token("s1").await;
        assert!(store.select_for_scope("echo:read", 100).await.is_none());
    }

    #[tokio::test]
    async fn reset_empties_the_table() {
        let store = SessionStore::new();
        store.insert(test_session("s1", "echo:read")).await;
        store.insert(test_session("s2", "echo:read")).await;
        assert_eq!(store.reset().await, 2);
        assert!(store.get("s1").await.is_none());
    }

    #[test]
    fn sids_are_random_and_well_formed() {
        let a = new_sid();
        let b = new_sid();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
