//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use tracing::warn;
use crate::utils::errors::{RouteBuddyError, Result};
use super::{Settings, StateBackend};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_bot_config(&settings.bot)?;
    validate_database_config(&settings.database)?;
    validate_state_config(&settings.state)?;
    validate_i18n_config(&settings.i18n)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate bot configuration
fn validate_bot_config(config: &super::BotConfig) -> Result<()> {
    if config.token.is_empty() {
        return Err(RouteBuddyError::Config(
            "Bot token is required".to_string()
        ));
    }

    if config.admin_ids.is_empty() {
        warn!("No admin IDs configured, /addroute and /stats are disabled");
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(RouteBuddyError::Config(
            "Database URL is required".to_string()
        ));
    }

    if !config.url.starts_with("sqlite:") {
        return Err(RouteBuddyError::Config(
            format!("Only sqlite database URLs are supported, got: {}", config.url)
        ));
    }

    if config.max_connections == 0 {
        return Err(RouteBuddyError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(RouteBuddyError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate conversation state configuration
fn validate_state_config(config: &super::StateConfig) -> Result<()> {
    if config.backend == StateBackend::Redis && config.redis_url.is_empty() {
        return Err(RouteBuddyError::Config(
            "Redis URL is required for the redis state backend".to_string()
        ));
    }

    Ok(())
}

/// Validate internationalization configuration
fn validate_i18n_config(config: &super::I18nConfig) -> Result<()> {
    if config.default_language.is_empty() {
        return Err(RouteBuddyError::Config(
            "Default language is required".to_string()
        ));
    }

    if !config.supported_languages.contains(&config.default_language) {
        return Err(RouteBuddyError::Config(
            "Default language must be in supported languages list".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(RouteBuddyError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.bot.token = "123:abc".to_string();
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_missing_token_rejected() {
        let settings = Settings::default();
        assert!(matches!(validate_settings(&settings), Err(RouteBuddyError::Config(_))));
    }

    #[test]
    fn test_non_sqlite_url_rejected() {
        let mut settings = valid_settings();
        settings.database.url = "postgresql://localhost/db".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_default_language_must_be_supported() {
        let mut settings = valid_settings();
        settings.i18n.default_language = "de".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "loud".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
