//! RouteBuddy Telegram Bot
//!
//! A Telegram bot for a trucking company: drivers register, start and finish
//! routes and log expenses with receipt photos. Everything is stored in
//! SQLite; admins get route creation and a fleet summary.

pub mod config;
pub mod handlers;
pub mod services;
pub mod models;
pub mod database;
pub mod state;
pub mod i18n;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{RouteBuddyError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ConversationEngine;
pub use state::StateStorage;
pub use i18n::I18n;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
