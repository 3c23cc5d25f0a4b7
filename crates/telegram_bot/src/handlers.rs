//! Teloxide endpoints: map updates to [`Event`]s and send the [`Reply`].

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, User},
};

use crate::{
    ConversationEngine,
    event::{Button, Event, Reply},
    parsing::split_command,
};

/// Telegram rejects callback data longer than this.
const MAX_CALLBACK_BYTES: usize = 64;

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    conversation: Arc<ConversationEngine>,
) -> ResponseResult<()> {
    let (Some(from), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };
    let group_id = msg.chat.id.0;
    let user = display_name(from);

    let event = match split_command(text) {
        Some((name, args)) => Event::command(group_id, &user, &name, &args),
        None => Event::text(group_id, &user, text),
    };
    if let Some(reply) = conversation.handle(event).await {
        send_reply(&bot, reply).await?;
    }
    Ok(())
}

pub(crate) async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    conversation: Arc<ConversationEngine>,
) -> ResponseResult<()> {
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let (Some(message), Some(tag)) = (q.message.as_ref(), q.data.as_deref()) else {
        return Ok(());
    };
    let group_id = message.chat().id.0;
    let user = display_name(&q.from);

    if let Some(reply) = conversation
        .handle(Event::callback(group_id, &user, tag))
        .await
    {
        send_reply(&bot, reply).await?;
    }
    Ok(())
}

/// Username when set, first name otherwise.
fn display_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.first_name.clone())
}

async fn send_reply(bot: &Bot, reply: Reply) -> ResponseResult<()> {
    let chat_id = ChatId(reply.group_id);

    if let Some(attachment) = reply.attachment {
        bot.send_document(
            chat_id,
            InputFile::memory(attachment.bytes).file_name(attachment.file_name),
        )
        .caption(reply.text)
        .await?;
        return Ok(());
    }

    match reply.buttons {
        Some(rows) => {
            bot.send_message(chat_id, reply.text)
                .reply_markup(keyboard(rows))
                .await?;
        }
        None => {
            bot.send_message(chat_id, reply.text).await?;
        }
    }
    Ok(())
}

fn keyboard(rows: Vec<Vec<Button>>) -> InlineKeyboardMarkup {
    let rows = rows.into_iter().filter_map(|row| {
        let buttons: Vec<InlineKeyboardButton> = row
            .into_iter()
            .filter(|button| {
                let fits = button.tag.len() <= MAX_CALLBACK_BYTES;
                if !fits {
                    tracing::debug!(tag = %button.tag, "button dropped, tag too long");
                }
                fits
            })
            .map(|button| InlineKeyboardButton::callback(button.label, button.tag))
            .collect();
        (!buttons.is_empty()).then_some(buttons)
    });
    InlineKeyboardMarkup::new(rows)
}
