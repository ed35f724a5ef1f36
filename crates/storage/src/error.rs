use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Raised by the in-memory store when a failure has been scheduled.
    #[error("write rejected: {0}")]
    Rejected(String),
}
