//! Rendering engine replies as Telegram requests

use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, KeyboardButton, KeyboardMarkup,
    KeyboardRemove, MessageId, ReplyMarkup,
};
use tracing::warn;
use crate::services::{InlineButton, Keyboard, Reply};
use crate::utils::errors::Result;

/// Send replies in order; `Edit` targets `message_id` and falls back to a new message
pub async fn deliver(bot: &Bot, chat_id: ChatId, message_id: Option<MessageId>, replies: Vec<Reply>) -> Result<()> {
    for reply in replies {
        match reply {
            Reply::Text { text, keyboard } => {
                send_text(bot, chat_id, text, keyboard).await?;
            }
            Reply::Edit { text, keyboard } => match message_id {
                Some(message_id) => {
                    let mut request = bot.edit_message_text(chat_id, message_id, text);
                    if let Some(Keyboard::Inline(rows)) = keyboard {
                        request = request.reply_markup(inline_markup(rows));
                    }
                    // editing to identical content is rejected by Telegram; nothing to redo
                    if let Err(e) = request.await {
                        warn!(chat_id = chat_id.0, error = %e, "Failed to edit message");
                    }
                }
                None => send_text(bot, chat_id, text, keyboard).await?,
            },
            Reply::Photo { file_id, caption } => {
                let mut request = bot.send_photo(chat_id, InputFile::file_id(file_id));
                if let Some(caption) = caption {
                    request = request.caption(caption);
                }
                request.await?;
            }
            Reply::Notice(text) => {
                send_text(bot, chat_id, text, None).await?;
            }
        }
    }

    Ok(())
}

async fn send_text(bot: &Bot, chat_id: ChatId, text: String, keyboard: Option<Keyboard>) -> Result<()> {
    let mut request = bot.send_message(chat_id, text);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(reply_markup(keyboard));
    }
    request.await?;
    Ok(())
}

pub fn reply_markup(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Menu(rows) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(
                rows.into_iter()
                    .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
            )
            .resize_keyboard(),
        ),
        Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_markup(rows)),
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

pub fn inline_markup(rows: Vec<Vec<InlineButton>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        rows.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|button| InlineKeyboardButton::callback(button.text, button.data))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
    )
}
