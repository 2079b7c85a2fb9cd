//! Routing/eligibility core.
//!
//! Every inbound message passes through [`classify`], which decides whether
//! the bot should respond, extracts the effective user text, and rebuilds the
//! minimal one-hop conversation context from the platform's own reply chain.
//! Nothing here is stored: the "memory" is always exactly the single message
//! being replied to.

use serde::Serialize;

/// The bot's own resolved identity, set once after connecting.
#[derive(Clone, Debug)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

impl BotIdentity {
    /// The `@username` handle as it appears in mention entities.
    pub fn handle(&self) -> String {
        format!("@{}", self.username)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatScope {
    Private,
    /// Anything that is not a one-to-one chat (groups, supergroups, channels).
    Group,
}

/// Platform-agnostic view of one inbound message, produced by the adapter.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub scope: ChatScope,
    /// Raw message text; `None` for non-text payloads such as voice notes.
    pub text: Option<String>,
    /// Underlying text slices of every mention entity in the message.
    pub mentions: Vec<String>,
    /// The replied-to message, whatever its payload was.
    pub reply_to: Option<RepliedTo>,
}

#[derive(Clone, Debug)]
pub struct RepliedTo {
    pub sender_id: Option<i64>,
    /// Text of the replied-to message; `None` for non-text payloads such as
    /// photos or stickers.
    pub text: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One prior exchange unit handed to the model as conversation context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Per-message eligibility decision. Computed fresh per update, never stored.
#[derive(Clone, Debug)]
pub struct Reaction {
    /// Whether the update warrants a model-generated reply.
    pub need_reaction: bool,
    /// Effective user text with the bot's handle stripped; may be empty after
    /// stripping, in which case the caller must not invoke the gateway.
    pub text: Option<String>,
    pub prev_turn: Option<Turn>,
    pub is_group: bool,
}

/// Decides whether the bot should react to `msg` and with what context.
///
/// Eligibility: private chat, or a group message that mentions the bot, or a
/// group message replying to one of the bot's own messages. Group messages
/// that merely address the bot conversationally are never eligible.
pub fn classify(msg: &IncomingMessage, me: &BotIdentity) -> Reaction {
    let is_group = msg.scope != ChatScope::Private;

    let handle = me.handle();
    let is_mention = msg.mentions.iter().any(|m| m == &handle);
    // Who was replied to matters for eligibility even when the replied-to
    // message had no text (a photo the bot sent, say); the text only decides
    // whether there is a previous turn to reconstruct.
    let is_reply_to_bot = msg
        .reply_to
        .as_ref()
        .and_then(|r| r.sender_id)
        .map_or(false, |id| id == me.id);

    let text = if is_mention {
        msg.text
            .as_ref()
            .map(|t| t.replacen(&handle, "", 1).trim().to_string())
    } else {
        msg.text.clone()
    };

    let prev_turn = msg.reply_to.as_ref().and_then(|r| {
        r.text.as_ref().map(|content| Turn {
            role: if is_reply_to_bot {
                Role::Assistant
            } else {
                Role::User
            },
            content: content.clone(),
        })
    });

    Reaction {
        need_reaction: !is_group || is_mention || is_reply_to_bot,
        text,
        prev_turn,
        is_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn me() -> BotIdentity {
        BotIdentity {
            id: 42,
            username: "botname".to_string(),
        }
    }

    fn text_msg(scope: ChatScope, text: &str) -> IncomingMessage {
        IncomingMessage {
            scope,
            text: Some(text.to_string()),
            mentions: vec![],
            reply_to: None,
        }
    }

    #[test]
    fn private_chats_always_react() {
        let r = classify(&text_msg(ChatScope::Private, "hello"), &me());
        assert!(r.need_reaction);
        assert!(!r.is_group);
        assert_eq!(r.text.as_deref(), Some("hello"));
        assert!(r.prev_turn.is_none());
    }

    #[test]
    fn group_without_mention_or_reply_is_ignored() {
        let r = classify(&text_msg(ChatScope::Group, "hey botname, you there?"), &me());
        assert!(!r.need_reaction);
        assert!(r.is_group);
        // Raw text passes through untouched for ineligible messages.
        assert_eq!(r.text.as_deref(), Some("hey botname, you there?"));
    }

    #[test]
    fn group_mention_reacts_and_strips_the_handle() {
        let mut msg = text_msg(ChatScope::Group, "@botname hello");
        msg.mentions = vec!["@botname".to_string()];
        let r = classify(&msg, &me());
        assert!(r.need_reaction);
        assert_eq!(r.text.as_deref(), Some("hello"));
    }

    #[test]
    fn mention_of_someone_else_does_not_count() {
        let mut msg = text_msg(ChatScope::Group, "@other hello");
        msg.mentions = vec!["@other".to_string()];
        let r = classify(&msg, &me());
        assert!(!r.need_reaction);
        assert_eq!(r.text.as_deref(), Some("@other hello"));
    }

    #[test]
    fn mention_with_nothing_else_leaves_empty_text() {
        let mut msg = text_msg(ChatScope::Group, "@botname");
        msg.mentions = vec!["@botname".to_string()];
        let r = classify(&msg, &me());
        assert!(r.need_reaction);
        assert_eq!(r.text.as_deref(), Some(""));
    }

    #[test]
    fn reply_to_bot_builds_assistant_turn_and_reacts_in_groups() {
        let mut msg = text_msg(ChatScope::Group, "and then?");
        msg.reply_to = Some(RepliedTo {
            sender_id: Some(42),
            text: Some("previous answer".to_string()),
        });
        let r = classify(&msg, &me());
        assert!(r.need_reaction);
        assert_eq!(
            r.prev_turn,
            Some(Turn {
                role: Role::Assistant,
                content: "previous answer".to_string(),
            })
        );
    }

    #[test]
    fn reply_to_bot_photo_reacts_without_a_previous_turn() {
        let mut msg = text_msg(ChatScope::Group, "make another one");
        msg.reply_to = Some(RepliedTo {
            sender_id: Some(42),
            text: None,
        });
        let r = classify(&msg, &me());
        assert!(r.need_reaction);
        assert!(r.prev_turn.is_none());
    }

    #[test]
    fn reply_to_another_user_builds_user_turn_without_reacting() {
        let mut msg = text_msg(ChatScope::Group, "what do you think?");
        msg.reply_to = Some(RepliedTo {
            sender_id: Some(7),
            text: Some("someone said something".to_string()),
        });
        let r = classify(&msg, &me());
        assert!(!r.need_reaction);
        assert_eq!(
            r.prev_turn,
            Some(Turn {
                role: Role::User,
                content: "someone said something".to_string(),
            })
        );
    }

    #[test]
    fn private_reply_context_is_reconstructed_too() {
        let mut msg = text_msg(ChatScope::Private, "continue");
        msg.reply_to = Some(RepliedTo {
            sender_id: Some(42),
            text: Some("earlier reply".to_string()),
        });
        let r = classify(&msg, &me());
        assert!(r.need_reaction);
        assert_eq!(r.prev_turn.unwrap().role, Role::Assistant);
    }

    #[test]
    fn voice_messages_carry_no_text_but_still_classify() {
        let msg = IncomingMessage {
            scope: ChatScope::Private,
            text: None,
            mentions: vec![],
            reply_to: None,
        };
        let r = classify(&msg, &me());
        assert!(r.need_reaction);
        assert!(r.text.is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        let turn = Turn {
            role: Role::Assistant,
            content: "x".to_string(),
        };
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
    }
}
