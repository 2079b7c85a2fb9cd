//! Telegram message handlers.
//!
//! Routing is deliberately flat: the `/pic` command goes to the image
//! handler, any other text (including unknown commands) goes through the
//! eligibility check of the text handler, voice notes go to the voice
//! pipeline. Everything else is ignored.

use std::sync::Arc;

use teloxide::{prelude::*, types::Me};

use crate::runtime::AppState;

mod commands;
mod text;
mod voice;

pub(crate) async fn handle_message(
    bot: Bot,
    msg: Message,
    me: Me,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    if let Some(raw) = msg.text() {
        if raw.starts_with('/') {
            let (cmd, rest) = parse_command(raw);
            if cmd == "pic" {
                return commands::handle_pic(bot, msg, rest, state).await;
            }
        }
        return text::handle_text(bot, msg, me, state).await;
    }

    if msg.voice().is_some() {
        return voice::handle_voice(bot, msg, me, state).await;
    }

    Ok(())
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    // Command names are matched case-sensitively; `/Pic` is not a command.
    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_string();

    (cmd, rest)
}
