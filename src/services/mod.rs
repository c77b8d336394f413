//! Services module
//!
//! Business logic behind the bot: the conversation engine and the
//! transport-neutral event and reply types it speaks.

pub mod conversation;
pub mod events;

pub use conversation::ConversationEngine;
pub use events::{BotCommand, CallbackAction, Event, EventKind, InlineButton, Keyboard, PhotoVariant, Reply};
