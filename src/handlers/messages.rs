//! Message handlers
//!
//! Plain text (including reply keyboard presses) and photos.

use teloxide::prelude::*;
use teloxide::types::PhotoSize;
use tracing::debug;
use crate::services::{ConversationEngine, Event, EventKind, PhotoVariant};
use crate::utils::errors::Result;
use super::replies::deliver;

/// Handle a non-command message
pub async fn handle_message(bot: Bot, msg: Message, engine: ConversationEngine) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;

    let kind = message_kind(&msg);
    debug!(user_id = user_id, chat_id = msg.chat.id.0, kind = ?kind, "Message received");

    let event = Event::new(user_id, kind).with_language(user.language_code.clone());
    let replies = engine.handle(event).await;

    deliver(&bot, msg.chat.id, None, replies).await
}

fn message_kind(msg: &Message) -> EventKind {
    if let Some(sizes) = msg.photo() {
        return EventKind::Photo(photo_variants(sizes));
    }

    // stickers, documents and the like count as empty text so dialogs reprompt
    EventKind::Text(msg.text().or_else(|| msg.caption()).unwrap_or_default().to_string())
}

fn photo_variants(sizes: &[PhotoSize]) -> Vec<PhotoVariant> {
    sizes
        .iter()
        .map(|size| PhotoVariant {
            file_id: size.file.id.clone(),
            width: size.width,
            height: size.height,
        })
        .collect()
}
