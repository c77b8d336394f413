//! Bot handlers module
//!
//! Telegram glue around the conversation engine:
//! - Command handlers for slash commands
//! - Callback handlers for inline keyboard presses
//! - Message handlers for text and photos

pub mod callbacks;
pub mod commands;
pub mod messages;
pub mod replies;

pub use callbacks::handle_callback_query;
pub use commands::{handle_command, Command};
pub use messages::handle_message;

use teloxide::dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use crate::utils::errors::RouteBuddyError;

/// Build the update handler tree
pub fn create_handler() -> UpdateHandler<RouteBuddyError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
                .branch(dptree::endpoint(handle_message)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback_query))
}
