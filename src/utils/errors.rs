//! Error handling for RouteBuddy
//!
//! This module defines the main error type used throughout the application
//! and maps every variant onto the small set of error kinds the conversation
//! engine reacts to.

use thiserror::Error;

/// Main error type for RouteBuddy application
#[derive(Error, Debug)]
pub enum RouteBuddyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Driver already registered: {telegram_id}")]
    Duplicate { telegram_id: i64 },

    #[error("Driver not registered: {telegram_id}")]
    DriverNotRegistered { telegram_id: i64 },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Result type alias for RouteBuddy operations
pub type Result<T> = std::result::Result<T, RouteBuddyError>;

/// Coarse error classes the conversation engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Duplicate,
    Storage,
    Transport,
    Config,
    Permission,
}

impl RouteBuddyError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouteBuddyError::Database(_)
            | RouteBuddyError::Migration(_)
            | RouteBuddyError::Redis(_)
            | RouteBuddyError::Serialization(_) => ErrorKind::Storage,
            RouteBuddyError::Telegram(_) | RouteBuddyError::Io(_) => ErrorKind::Transport,
            RouteBuddyError::Config(_) => ErrorKind::Config,
            RouteBuddyError::Validation(_) => ErrorKind::Validation,
            RouteBuddyError::Conflict(_) => ErrorKind::Conflict,
            RouteBuddyError::NotFound(_) | RouteBuddyError::DriverNotRegistered { .. } => {
                ErrorKind::NotFound
            }
            RouteBuddyError::Duplicate { .. } => ErrorKind::Duplicate,
            RouteBuddyError::PermissionDenied(_) => ErrorKind::Permission,
        }
    }

    /// Check if the user can recover by resending input
    pub fn is_recoverable(&self) -> bool {
        match self {
            RouteBuddyError::Database(_) => true,
            RouteBuddyError::Migration(_) => false,
            RouteBuddyError::Telegram(_) => true,
            RouteBuddyError::Redis(_) => true,
            RouteBuddyError::Serialization(_) => false,
            RouteBuddyError::Io(_) => true,
            RouteBuddyError::Config(_) => false,
            RouteBuddyError::Validation(_) => true,
            RouteBuddyError::Conflict(_) => true,
            RouteBuddyError::NotFound(_) => false,
            RouteBuddyError::Duplicate { .. } => false,
            RouteBuddyError::DriverNotRegistered { .. } => true,
            RouteBuddyError::PermissionDenied(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RouteBuddyError::Migration(_) => ErrorSeverity::Critical,
            RouteBuddyError::Config(_) => ErrorSeverity::Critical,
            RouteBuddyError::Database(_) => ErrorSeverity::Error,
            RouteBuddyError::PermissionDenied(_) => ErrorSeverity::Warning,
            RouteBuddyError::Conflict(_) => ErrorSeverity::Info,
            RouteBuddyError::Validation(_) => ErrorSeverity::Info,
            RouteBuddyError::NotFound(_) => ErrorSeverity::Info,
            RouteBuddyError::Duplicate { .. } => ErrorSeverity::Warning,
            RouteBuddyError::DriverNotRegistered { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Map a sqlx unique constraint violation on driver insert to `Duplicate`
    pub(crate) fn from_driver_insert(error: sqlx::Error, telegram_id: i64) -> Self {
        match &error {
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                RouteBuddyError::Duplicate { telegram_id }
            }
            _ => RouteBuddyError::Database(error),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
