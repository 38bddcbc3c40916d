//! PostgreSQL implementation of SessionStore.
//!
//! One row per session. The turn log and the brief data are stored as JSONB
//! documents in the same shape the rest of the system sees them.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::domain::brief::BriefData;
use crate::domain::foundation::{SessionId, Timestamp};
use crate::domain::session::{Session, Turn};
use crate::ports::{SessionStore, SessionStoreError};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS brief_sessions (
    id TEXT PRIMARY KEY,
    message JSONB NOT NULL DEFAULT '[]'::jsonb,
    data JSONB NOT NULL DEFAULT '{}'::jsonb,
    owner_id TEXT NULL,
    campaign_id TEXT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)
"#;

/// PostgreSQL implementation of SessionStore.
#[derive(Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool and makes sure the sessions table exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, SessionStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| database_error("connect", e))?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the sessions table when it is missing.
    pub async fn ensure_schema(&self) -> Result<(), SessionStoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("create schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, message, data, owner_id, campaign_id, created_at, updated_at
            FROM brief_sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error("fetch session", e))?;

        row.map(row_to_session).transpose()
    }

    async fn create(&self, session: &Session) -> Result<(), SessionStoreError> {
        let (message, data) = encode_document(session)?;

        let result = sqlx::query(
            r#"
            INSERT INTO brief_sessions (
                id, message, data, owner_id, campaign_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id().as_str())
        .bind(message)
        .bind(data)
        .bind(session.owner_id())
        .bind(session.campaign_id())
        .bind(session.created_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(SessionStoreError::AlreadyExists(session.id().clone()))
            }
            Err(e) => Err(database_error("insert session", e)),
        }
    }

    async fn update(&self, session: &Session) -> Result<(), SessionStoreError> {
        let (message, data) = encode_document(session)?;

        // Last write wins; there is no version check.
        let result = sqlx::query(
            r#"
            UPDATE brief_sessions SET
                message = $2,
                data = $3,
                owner_id = $4,
                campaign_id = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(session.id().as_str())
        .bind(message)
        .bind(data)
        .bind(session.owner_id())
        .bind(session.campaign_id())
        .bind(session.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| database_error("update session", e))?;

        if result.rows_affected() == 0 {
            return Err(SessionStoreError::NotFound(session.id().clone()));
        }

        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn database_error(action: &str, e: sqlx::Error) -> SessionStoreError {
    SessionStoreError::DatabaseError(format!("Failed to {}: {}", action, e))
}

fn encode_document(session: &Session) -> Result<(Value, Value), SessionStoreError> {
    let message = serde_json::to_value(session.turns())
        .map_err(|e| SessionStoreError::SerializationFailed(e.to_string()))?;
    let data = serde_json::to_value(session.data())
        .map_err(|e| SessionStoreError::SerializationFailed(e.to_string()))?;
    Ok((message, data))
}

fn decode_document(message: Value, data: Value) -> Result<(Vec<Turn>, BriefData), SessionStoreError> {
    let turns: Vec<Turn> = serde_json::from_value(message)
        .map_err(|e| SessionStoreError::SerializationFailed(format!("message: {}", e)))?;
    let data: BriefData = serde_json::from_value(data)
        .map_err(|e| SessionStoreError::SerializationFailed(format!("data: {}", e)))?;
    Ok((turns, data))
}

fn row_to_session(row: sqlx::postgres::PgRow) -> Result<Session, SessionStoreError> {
    let id: String = row.try_get("id").map_err(|e| database_error("get id", e))?;
    let message: Value = row
        .try_get("message")
        .map_err(|e| database_error("get message", e))?;
    let data: Value = row.try_get("data").map_err(|e| database_error("get data", e))?;
    let owner_id: Option<String> = row
        .try_get("owner_id")
        .map_err(|e| database_error("get owner_id", e))?;
    let campaign_id: Option<String> = row
        .try_get("campaign_id")
        .map_err(|e| database_error("get campaign_id", e))?;
    let created_at: chrono::DateTime<chrono::Utc> = row
        .try_get("created_at")
        .map_err(|e| database_error("get created_at", e))?;
    let updated_at: chrono::DateTime<chrono::Utc> = row
        .try_get("updated_at")
        .map_err(|e| database_error("get updated_at", e))?;

    let id = SessionId::new(id)
        .map_err(|e| SessionStoreError::SerializationFailed(format!("id: {}", e)))?;
    let (turns, data) = decode_document(message, data)?;

    Ok(Session::reconstitute(
        id,
        turns,
        data,
        owner_id,
        campaign_id,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}
