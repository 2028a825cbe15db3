use thiserror::Error;

/// Centralized error types for the application
///
/// User-recoverable input problems (bad digits, out-of-range values) live in
/// `core::validation` and are resolved inside flow handlers without ever
/// becoming an `AppError`. This enum covers everything that escapes a
/// handler: storage failures, permission refusals, conflicts, throttling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Schema migration errors
    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    /// Telegram API errors
    #[error("telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// IO errors (snapshot and backup files)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization errors
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A write was rejected before touching storage
    #[error("validation rejected: {0}")]
    Validation(String),

    /// A non-admin invoked an admin-only entry point
    #[error("unauthorized: user {0} is not an admin")]
    Unauthorized(i64),

    /// A second flow family was started while another owns the user
    #[error("user {user_id} is busy with the '{flow}' flow")]
    BusyConflict { user_id: i64, flow: &'static str },

    /// Too many flow entries inside the sliding window
    #[error("user {0} is rate limited")]
    RateLimited(i64),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Storage-side failures are surfaced to users as a generic notice and
    /// logged with full context; everything else has a specific message.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::DatabasePool(_) | AppError::Migration(_) | AppError::Io(_)
        )
    }
}
