//! RouteBuddy Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use route_buddy::{
    config::Settings,
    database::{self, DatabaseConfig},
    handlers::{create_handler, Command},
    i18n::I18n,
    services::ConversationEngine,
    state::StateStorage,
    utils::logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the log file on shutdown
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", route_buddy::info());

    info!("Connecting to database...");
    let db = database::connect(&DatabaseConfig::from(&settings.database)).await?;

    info!(backend = ?settings.state.backend, "Initializing conversation state storage...");
    let state_storage = StateStorage::new(&settings.state).await?;

    info!("Loading translations...");
    let mut i18n = I18n::new(&settings.i18n);
    i18n.load_translations().await?;

    let engine = ConversationEngine::new(
        db.clone(),
        state_storage,
        Arc::new(i18n),
        settings.bot.admin_ids.clone(),
    );

    let bot = Bot::new(&settings.bot.token);
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    let mut dispatcher = Dispatcher::builder(bot, create_handler())
        .dependencies(dptree::deps![engine])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.kind);
        })
        .enable_ctrlc_handler()
        .build();

    info!("RouteBuddy bot is ready, starting polling...");
    dispatcher.dispatch().await;

    db.close().await;
    info!("RouteBuddy bot has been shut down.");

    Ok(())
}
