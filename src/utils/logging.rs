//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the RouteBuddy application.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{RouteBuddyError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file appender on drop and must be held
/// for as long as the process runs.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    let (file_layer, guard) = if config.file_dir.is_empty() {
        (None, None)
    } else {
        let file_appender = tracing_appender::rolling::daily(&config.file_dir, "routebuddy.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| RouteBuddyError::Config(format!("Failed to initialize logging: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log user actions with structured data
pub fn log_user_action(user_id: i64, action: &str, details: Option<&str>) {
    info!(
        user_id = user_id,
        action = action,
        details = details,
        "User action performed"
    );
}

/// Log route lifecycle events
pub fn log_route_event(driver_id: i64, route_id: i64, event: &str) {
    info!(
        driver_id = driver_id,
        route_id = route_id,
        event = event,
        "Route event occurred"
    );
}

/// Log a persisted expense
pub fn log_expense_recorded(driver_id: i64, expense_id: i64, category: &str, amount: f64, route_execution_id: Option<i64>) {
    info!(
        driver_id = driver_id,
        expense_id = expense_id,
        category = category,
        amount = amount,
        route_execution_id = route_execution_id,
        "Expense recorded"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        details = details,
        "Admin action performed"
    );
}

/// Log errors surfaced to a user with context
pub fn log_handler_error(user_id: i64, error: &RouteBuddyError, context: &str) {
    error!(
        user_id = user_id,
        error = %error,
        severity = %error.severity(),
        recoverable = error.is_recoverable(),
        context = context,
        "Handler error occurred"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
