//! Middleware chain run before handler dispatch.
//!
//! Stages are ordered; each one inspects the update and signals whether
//! dispatch should proceed. Access control runs first, then update logging,
//! mirroring the registration order of the original middlewares.

use async_trait::async_trait;
use teloxide::{prelude::*, types::InputFile};
use tracing::{error, info, warn};

/// Fixed sticker sent to unauthorized private chats.
const STICKER_FILE_ID_ACCESS_DENIED: &str =
    "CAACAgIAAxkBAANSZGOgyP8Q5ELcCqBp4SHddNmp7kwAAkUTAAJpr8lLqaVJkKIF8sMvBA";

/// Continuation signal: either hand the update to the next stage (and finally
/// the handlers), or stop processing it entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, bot: &Bot, update: &Update) -> Flow;
}

#[derive(Debug, PartialEq, Eq)]
enum Access {
    Allow,
    DenyWithSticker,
    DenySilent,
}

fn access_decision(chat_id: i64, is_private: bool, allowed: &[i64]) -> Access {
    if allowed.contains(&chat_id) {
        return Access::Allow;
    }
    if is_private {
        Access::DenyWithSticker
    } else {
        // Do not spam group chats with denial stickers.
        Access::DenySilent
    }
}

/// Drops updates from chats outside the allowlist. Unauthorized private chats
/// get a fixed "access denied" sticker; other chat types are dropped silently.
pub struct AccessControl {
    allowed: Vec<i64>,
}

impl AccessControl {
    pub fn new(allowed: Vec<i64>) -> Self {
        Self { allowed }
    }
}

#[async_trait]
impl Middleware for AccessControl {
    async fn handle(&self, bot: &Bot, update: &Update) -> Flow {
        // No chat = no service.
        let Some(chat) = update.chat() else {
            return Flow::Stop;
        };

        match access_decision(chat.id.0, chat.is_private(), &self.allowed) {
            Access::Allow => Flow::Continue,
            Access::DenyWithSticker => {
                warn!(chat_id = chat.id.0, "rejecting update from unsupported chat");
                let sticker = InputFile::file_id(STICKER_FILE_ID_ACCESS_DENIED);
                if let Err(e) = bot.send_sticker(chat.id, sticker).await {
                    error!(error = %e, chat_id = chat.id.0, "access denied sticker failed");
                }
                Flow::Stop
            }
            Access::DenySilent => {
                warn!(chat_id = chat.id.0, "rejecting update from unsupported chat");
                Flow::Stop
            }
        }
    }
}

/// Logs every update that passed access control.
pub struct UpdateLogger;

#[async_trait]
impl Middleware for UpdateLogger {
    async fn handle(&self, _bot: &Bot, update: &Update) -> Flow {
        info!(
            user = update
                .user()
                .and_then(|u| u.username.as_deref())
                .unwrap_or("unknown"),
            chat_id = update.chat().map(|c| c.id.0),
            update = ?update,
            "telegram update"
        );
        Flow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[i64] = &[100, -200];

    #[test]
    fn allowlisted_chats_pass() {
        assert_eq!(access_decision(100, true, ALLOWED), Access::Allow);
        assert_eq!(access_decision(-200, false, ALLOWED), Access::Allow);
    }

    #[test]
    fn unknown_private_chat_gets_the_sticker() {
        assert_eq!(access_decision(7, true, ALLOWED), Access::DenyWithSticker);
    }

    #[test]
    fn unknown_group_chat_is_dropped_silently() {
        assert_eq!(access_decision(7, false, ALLOWED), Access::DenySilent);
    }

    #[test]
    fn empty_allowlist_denies_everyone() {
        assert_eq!(access_decision(100, true, &[]), Access::DenyWithSticker);
    }
}
