//! Callback query handlers
//!
//! Inline button presses. Every query is answered, with the engine's notice
//! as toast text when there is one.

use teloxide::prelude::*;
use tracing::{debug, warn};
use crate::services::{ConversationEngine, Event, EventKind, Reply};
use crate::utils::errors::Result;
use super::replies::deliver;

/// Main callback query dispatcher
pub async fn handle_callback_query(bot: Bot, query: CallbackQuery, engine: ConversationEngine) -> Result<()> {
    let user_id = query.from.id.0 as i64;
    let data = query.data.clone().unwrap_or_default();
    debug!(user_id = user_id, callback_data = %data, "Callback query received");

    let event = Event::new(user_id, EventKind::Callback(data))
        .with_language(query.from.language_code.clone());
    let replies = engine.handle(event).await;

    let (notices, replies): (Vec<Reply>, Vec<Reply>) = replies
        .into_iter()
        .partition(|reply| matches!(reply, Reply::Notice(_)));

    let mut answer = bot.answer_callback_query(query.id.clone());
    if let Some(Reply::Notice(text)) = notices.into_iter().next() {
        answer = answer.text(text);
    }
    if let Err(e) = answer.await {
        warn!(user_id = user_id, error = %e, "Failed to answer callback query");
    }

    let (chat_id, message_id) = match query.message.as_ref() {
        Some(message) => (message.chat().id, Some(message.id())),
        None => (ChatId(user_id), None),
    };

    deliver(&bot, chat_id, message_id, replies).await
}
