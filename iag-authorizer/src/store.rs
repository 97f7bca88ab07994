//! Delegation store
//!
//! One row per `(subject, agent_id, tool_id)`; newer writes upsert. The
//! raw signed envelope and its verification key are persisted alongside
//! the parsed claims for audit.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use iag_common::{DelegationConstraints, DelegationRecord, IagError, Result};

/// A verified, persisted delegation.
#[derive(Debug, Clone)]
pub struct StoredDelegation {
    pub subject: String,
    pub agent_id: String,
    pub tool_id: String,
    pub scopes: Vec<String>,
    pub not_after: i64,
    pub issuer: String,
    pub constraints: Option<DelegationConstraints>,

    /// The compact signed token as submitted
    pub jws: String,

    /// JSON of the verification key
    pub public_jwk: String,
}

impl StoredDelegation {
    /// Listing view without the signature material.
    pub fn as_record(&self) -> DelegationRecord {
        DelegationRecord {
            subject: self.subject.clone(),
            agent_id: self.agent_id.clone(),
            tool_id: self.tool_id.clone(),
            scopes: self.scopes.clone(),
            not_after: self.not_after,
            issuer: self.issuer.clone(),
            constraints: self.constraints.clone(),
        }
    }
}

#[derive(Clone)]
pub struct DelegationStore {
    pool: SqlitePool,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS delegations (
    subject     TEXT    NOT NULL,
    agent_id    TEXT    NOT NULL,
    tool_id     TEXT    NOT NULL,
    scopes      TEXT    NOT NULL,
    not_after   INTEGER NOT NULL,
    issuer      TEXT    NOT NULL,
    constraints TEXT,
    jws         TEXT    NOT NULL,
    public_jwk  TEXT    NOT NULL,
    updated_at  INTEGER NOT NULL,
    PRIMARY KEY (subject, agent_id, tool_id)
)";

impl DelegationStore {
    /// Opens (creating if missing) the store at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err)?;
        Self::init(pool).await
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(store_err)?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await.map_err(store_err)?;
        Ok(Self { pool })
    }

    pub async fn upsert(&self, delegation: &StoredDelegation, now: i64) -> Result<()> {
        let scopes = serde_json::to_string(&delegation.scopes)?;
        let constraints = delegation
            .constraints
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO delegations
               (subject, agent_id, tool_id, scopes, not_after, issuer, constraints, jws, public_jwk, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (subject, agent_id, tool_id) DO UPDATE SET
               scopes = excluded.scopes,
               not_after = excluded.not_after,
               issuer = excluded.issuer,
               constraints = excluded.constraints,
               jws = excluded.jws,
               public_jwk = excluded.public_jwk,
               updated_at = excluded.updated_at",
        )
        .bind(&delegation.subject)
        .bind(&delegation.agent_id)
        .bind(&delegation.tool_id)
        .bind(scopes)
        .bind(delegation.not_after)
        .bind(&delegation.issuer)
        .bind(constraints)
        .bind(&delegation.jws)
        .bind(&delegation.public_jwk)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    pub async fn find(
        &self,
        subject: &str,
        agent_id: &str,
        tool_id: &str,
    ) -> Result<Option<StoredDelegation>> {
        let row = sqlx::query(
            "SELECT subject, agent_id, tool_id, scopes, not_after, issuer, constraints, jws, public_jwk
             FROM delegations WHERE subject = ?1 AND agent_id = ?2 AND tool_id = ?3",
        )
        .bind(subject)
        .bind(agent_id)
        .bind(tool_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(row_to_delegation).transpose()
    }

    pub async fn list(&self) -> Result<Vec<StoredDelegation>> {
        let rows = sqlx::query(
            "SELECT subject, agent_id, tool_id, scopes, not_after, issuer, constraints, jws, public_jwk
             FROM delegations ORDER BY subject, agent_id, tool_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.into_iter().map(row_to_delegation).collect()
    }
}

fn row_to_delegation(row: sqlx::sqlite::SqliteRow) -> Result<StoredDelegation> {
    let scopes_json: String = row.try_get("scopes").map_err(store_err)?;
    let constraints_json: Option<String> = row.try_get("constraints").map_err(store_err)?;

    Ok(StoredDelegation {
        subject: row.try_get("subject").map_err(store_err)?,
        agent_id: row.try_get("agent_id").map_err(store_err)?,
        tool_id: row.try_get("tool_id").map_err(store_err)?,
        scopes: serde_json::from_str(&scopes_json)?,
        not_after: row.try_get("not_after").map_err(store_err)?,
        issuer: row.try_get("issuer").map_err(store_err)?,
        constraints: constraints_json
            .map(|c| serde_json::from_str(&c))
            .transpose()?,
        jws: row.try_get("jws").map_err(store_err)?,
        public_jwk: row.try_get("public_jwk").map_err(store_err)?,
    })
}

fn store_err(err: sqlx::Error) -> IagError {
    IagError::Internal(format!("delegation store: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delegation(subject: &str, tool: &str, scopes: &[&str]) -> StoredDelegation {
        StoredDelegation {
            subject: subject.into(),
            agent_id: "agent-demo".into(),
            tool_id: tool.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            not_after: 4_102_444_800,
            issuer: subject.into(),
            constraints: None,
            jws: "a.b.c".into(),
            public_jwk: "{}".into(),
        }
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = DelegationStore::open_in_memory().await.unwrap();
        let d = delegation("user-123", "mcp.pay", &["payments:charge"]);
        store.upsert(&d, 100).await.unwrap();

        let found = store
            .find("user-123", "agent-demo", "mcp.pay")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.scopes, vec!["payments:charge"]);
        assert_eq!(found.not_after, 4_102_444_800);
        assert_eq!(found.jws, "a.b.c");

        assert!(store
            .find("user-123", "agent-demo", "mcp.echo")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_by_key() {
        let store = DelegationStore::open_in_memory().await.unwrap();
        store
            .upsert(&delegation("user-123", "mcp.pay", &["payments:charge"]), 100)
            .await
            .unwrap();

        let mut newer = delegation("user-123", "mcp.pay", &["payments:charge", "tickets:read"]);
        newer.constraints = Some(DelegationConstraints {
            max_amount_cents: Some(2000),
            merchants: Some(vec!["mcp-tix".into()]),
        });
        store.upsert(&newer, 200).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].scopes.len(), 2);
        assert_eq!(
            all[0].constraints.as_ref().unwrap().max_amount_cents,
            Some(2000)
        );
    }

    #[tokio::test]
    async fn list_is_keyed_and_ordered() {
        let store = DelegationStore::open_in_memory().await.unwrap();
        store
            .upsert(&delegation("user-123", "mcp.tickets", &["tickets:read"]), 100)
            .await
            .unwrap();
        store
            .upsert(&delegation("user-123", "mcp.echo", &["echo:read"]), 100)
            .await
            .unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].tool_id, "mcp.echo");
        assert_eq!(all[1].tool_id, "mcp.tickets");
    }
}
