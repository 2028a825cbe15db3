//! Update handlers: Telegram types in, reply instructions out
//!
//! The only place that converts between teloxide types and the flow
//! layer's [`InboundEvent`]/[`Reply`] contract. Callback payloads are
//! decoded into triggers here, once, at the boundary.

use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use crate::flow::{FlowRuntime, InboundEvent, Reply, Trigger};
use crate::telegram::bot::Command;

/// Handles a recognized command.
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command, runtime: Arc<FlowRuntime>) -> ResponseResult<()> {
    let user_id = msg.chat.id.0;
    let event = InboundEvent::trigger(user_id, cmd.into_trigger());
    let replies = runtime.handle_event(event);
    send_replies(&bot, replies).await
}

/// Handles plain text messages. Non-text content (stickers, photos) is
/// ignored — the flows only consume text and button presses.
pub async fn handle_message(bot: Bot, msg: Message, runtime: Arc<FlowRuntime>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = msg.chat.id.0;
    let event = InboundEvent::text(user_id, text);
    let replies = runtime.handle_event(event);
    send_replies(&bot, replies).await
}

/// Handles inline keyboard presses.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, runtime: Arc<FlowRuntime>) -> ResponseResult<()> {
    // Stop the client-side loading spinner regardless of the outcome.
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(trigger) = q.data.as_deref().and_then(Trigger::decode) else {
        log::warn!("undecodable callback payload: {:?}", q.data);
        return Ok(());
    };

    let user_id = i64::try_from(q.from.id.0).unwrap_or_default();
    let event = InboundEvent::trigger(user_id, trigger);
    let replies = runtime.handle_event(event);
    send_replies(&bot, replies).await
}

/// Renders reply instructions: text as HTML, choice sets as inline
/// keyboards with encoded trigger payloads.
async fn send_replies(bot: &Bot, replies: Vec<Reply>) -> ResponseResult<()> {
    for reply in replies {
        let request = bot
            .send_message(ChatId(reply.user_id), reply.text)
            .parse_mode(ParseMode::Html);

        match reply.choices {
            Some(choices) => {
                let rows: Vec<Vec<InlineKeyboardButton>> = choices
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|choice| InlineKeyboardButton::callback(choice.label, choice.trigger.encode()))
                            .collect()
                    })
                    .collect();
                request.reply_markup(InlineKeyboardMarkup::new(rows)).await?;
            }
            None => {
                request.await?;
            }
        }
    }
    Ok(())
}
