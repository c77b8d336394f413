//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from defaults, TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub state: StateConfig,
    pub i18n: I18nConfig,
    pub logging: LoggingConfig,
}

/// Telegram bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub token: String,
    /// Empty lists are dropped by the `config` crate, so this must default
    #[serde(default)]
    pub admin_ids: Vec<i64>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Where per-user conversation state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    Memory,
    Redis,
}

/// Conversation state configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateConfig {
    pub backend: StateBackend,
    pub redis_url: String,
    pub prefix: String,
}

/// Internationalization configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct I18nConfig {
    pub default_language: String,
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
    pub translations_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file; empty disables file logging
    pub file_dir: String,
    pub json: bool,
}

impl Settings {
    /// Load settings from defaults, `config.toml` and `ROUTEBUDDY__*` environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("ROUTEBUDDY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bot.admin_ids")
                    .with_list_parse_key("i18n.supported_languages")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = settings.try_deserialize()?;

        // Plain BOT_TOKEN is what deployments of the bot have always used
        if settings.bot.token.is_empty() {
            if let Ok(token) = std::env::var("BOT_TOKEN") {
                settings.bot.token = token;
            }
        }

        Ok(settings)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::RouteBuddyError> {
        super::validation::validate_settings(self)
    }
}

fn default_supported_languages() -> Vec<String> {
    vec!["ru".to_string(), "en".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                token: String::new(),
                admin_ids: vec![],
            },
            database: DatabaseConfig {
                url: "sqlite://transport_expenses.db".to_string(),
                max_connections: 5,
                min_connections: 1,
            },
            state: StateConfig {
                backend: StateBackend::Memory,
                redis_url: "redis://localhost:6379".to_string(),
                prefix: "routebuddy:".to_string(),
            },
            i18n: I18nConfig {
                default_language: "ru".to_string(),
                supported_languages: default_supported_languages(),
                translations_dir: "translations".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_dir: String::new(),
                json: false,
            },
        }
    }
}
