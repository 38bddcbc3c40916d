//! Session store port.
//!
//! Durable keyed storage of conversation sessions. The store is the only
//! coordination point between requests: implementations must not rely on
//! process affinity, and concurrent updates to one id are last-write-wins.

use async_trait::async_trait;

use crate::domain::foundation::SessionId;
use crate::domain::session::Session;

/// Errors that can occur during session store operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session already exists: {0}")]
    AlreadyExists(SessionId),

    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Failed to serialize session: {0}")]
    SerializationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Port for persisting and loading sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Find a session by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<Session>, SessionStoreError>;

    /// Create a new session.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a session with this id was created first
    /// - `DatabaseError` on persistence failure
    async fn create(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Overwrite the turns, data and references of an existing session.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, session: &Session) -> Result<(), SessionStoreError>;
}
