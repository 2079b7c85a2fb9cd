use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{ChatAction, Me},
};
use tracing::{error, warn};

use gtb_core::routing::classify;

use crate::runtime::AppState;
use crate::{bot_identity, incoming_message};

pub(crate) async fn handle_text(
    bot: Bot,
    msg: Message,
    me: Me,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let reaction = classify(&incoming_message(&msg), &bot_identity(&me));
    if !reaction.need_reaction {
        return Ok(());
    }

    // A bare mention strips down to nothing; never call the model on empty text.
    let Some(text) = reaction.text.filter(|t| !t.trim().is_empty()) else {
        return Ok(());
    };

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        warn!(error = %e, chat_id = msg.chat.id.0, "typing action failed");
    }

    let response = match state
        .openai
        .chat_completion(&text, reaction.prev_turn.as_ref())
        .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, chat_id = msg.chat.id.0, "chat completion failed");
            return Ok(());
        }
    };

    let mut reply = bot.send_message(msg.chat.id, response);
    if reaction.is_group {
        reply = reply.reply_to_message_id(msg.id);
    }
    if let Err(e) = reply.await {
        error!(error = %e, chat_id = msg.chat.id.0, "sending reply failed");
    }

    Ok(())
}
