//! Command handlers
//!
//! Slash commands recognized by the bot and their translation into engine
//! commands.

use teloxide::{prelude::*, utils::command::BotCommands};
use tracing::info;
use crate::services::{BotCommand, ConversationEngine, Event, EventKind};
use crate::utils::errors::Result;
use super::replies::deliver;

/// All available bot commands
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "RouteBuddy commands:")]
pub enum Command {
    #[command(description = "Register or show the main menu")]
    Start,
    #[command(description = "Show help information")]
    Help,
    #[command(description = "Cancel the current action")]
    Cancel,
    #[command(description = "List my expenses")]
    Expenses,
    #[command(description = "Show my active or available routes")]
    Routes,
    #[command(description = "Show completed routes")]
    History,
    #[command(description = "Create a route: origin;destination;distance;price;cargo[;driver_id] (admin only)")]
    AddRoute(String),
    #[command(description = "Fleet statistics (admin only)")]
    Stats,
    #[command(description = "Assigned and in-progress trips (admin only)")]
    Active,
    #[command(description = "Trip history: driver=ID; status=...; cargo=... (admin only)")]
    Executions(String),
}

impl From<Command> for BotCommand {
    fn from(command: Command) -> Self {
        match command {
            Command::Start => BotCommand::Start,
            Command::Help => BotCommand::Help,
            Command::Cancel => BotCommand::Cancel,
            Command::Expenses => BotCommand::Expenses,
            Command::Routes => BotCommand::Routes,
            Command::History => BotCommand::History,
            Command::AddRoute(args) => BotCommand::AddRoute(args),
            Command::Stats => BotCommand::Stats,
            Command::Active => BotCommand::Active,
            Command::Executions(args) => BotCommand::Executions(args),
        }
    }
}

/// Main command dispatcher
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, engine: ConversationEngine) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    info!(user_id = user_id, command = ?cmd, "Command received");

    let event = Event::new(user_id, EventKind::Command(cmd.into()))
        .with_language(user.language_code.clone());
    let replies = engine.handle(event).await;

    deliver(&bot, msg.chat.id, None, replies).await
}
