use async_trait::async_trait;
use thiserror::Error;

use super::manager::DatabaseError;
use super::models::AlmSetting;

/// Errors surfaced by a settings store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another setting already holds this key
    #[error("Unique key violation: {0}")]
    UniqueViolation(String),

    /// The record being written disappeared underneath the transaction
    #[error("Record not found: {0}")]
    Missing(String),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // SQLSTATE 23505: unique_violation
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
        }
        match err {
            e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Database(DatabaseError::Sqlx(other)),
        }
    }
}

/// Key-addressed, transactional access to ALM settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Open a read-write transaction. Dropping it without `commit` discards its writes.
    async fn begin(&self) -> Result<Box<dyn SettingsTransaction>, StoreError>;

    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SettingsTransaction: Send {
    async fn select_by_key(&mut self, key: &str) -> Result<Option<AlmSetting>, StoreError>;

    /// Rewrite the record identified by `setting.uuid`, including its key
    async fn update(&mut self, setting: &AlmSetting) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
