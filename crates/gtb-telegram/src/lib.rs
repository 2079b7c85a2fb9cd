//! Telegram adapter (teloxide).
//!
//! Owns the platform connection lifecycle and converts teloxide updates into
//! the framework-agnostic view the routing core works on.

use teloxide::types::{Me, Message, MessageEntity, MessageEntityKind};

use gtb_core::routing::{BotIdentity, ChatScope, IncomingMessage, RepliedTo};

pub mod handlers;
pub mod middleware;
pub mod runtime;
pub mod webhook;

pub(crate) fn bot_identity(me: &Me) -> BotIdentity {
    BotIdentity {
        id: me.user.id.0 as i64,
        username: me.username().to_string(),
    }
}

/// Projects a teloxide message onto the routing core's view of it.
pub(crate) fn incoming_message(msg: &Message) -> IncomingMessage {
    let scope = if msg.chat.is_private() {
        ChatScope::Private
    } else {
        ChatScope::Group
    };

    let mentions = match (msg.text(), msg.entities()) {
        (Some(text), Some(entities)) => mention_slices(text, entities),
        _ => Vec::new(),
    };

    // The replied-to sender is recorded even for non-text payloads such as
    // photos: a reply to one of the bot's pictures is still addressed to it.
    let reply_to = msg.reply_to_message().map(|replied| RepliedTo {
        sender_id: replied.from().map(|u| u.id.0 as i64),
        text: replied.text().map(|t| t.to_string()),
    });

    IncomingMessage {
        scope,
        text: msg.text().map(|s| s.to_string()),
        mentions,
        reply_to,
    }
}

fn mention_slices(text: &str, entities: &[MessageEntity]) -> Vec<String> {
    entities
        .iter()
        .filter(|e| matches!(e.kind, MessageEntityKind::Mention))
        .filter_map(|e| utf16_slice(text, e.offset, e.length))
        .collect()
}

/// Extracts the substring covered by a Telegram entity. Entity offsets and
/// lengths are UTF-16 code units, not bytes or chars.
fn utf16_slice(text: &str, offset: usize, length: usize) -> Option<String> {
    let end = offset.checked_add(length)?;
    let mut out = String::new();
    let mut collected = 0usize;
    let mut pos = 0usize;

    for ch in text.chars() {
        if pos >= end {
            break;
        }
        if pos >= offset {
            out.push(ch);
            collected += ch.len_utf16();
        }
        pos += ch.len_utf16();
    }

    // Short text or an entity straddling a code-point boundary: not a slice.
    if collected == length {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_slice_ascii() {
        assert_eq!(utf16_slice("@bot hello", 0, 4).as_deref(), Some("@bot"));
        assert_eq!(utf16_slice("hey @bot", 4, 4).as_deref(), Some("@bot"));
    }

    #[test]
    fn utf16_slice_counts_surrogate_pairs() {
        // The crab emoji is two UTF-16 code units, so "@bot" starts at 3.
        assert_eq!(utf16_slice("🦀 @bot hi", 3, 4).as_deref(), Some("@bot"));
    }

    #[test]
    fn utf16_slice_out_of_range_is_none() {
        assert_eq!(utf16_slice("short", 3, 10), None);
        assert_eq!(utf16_slice("short", usize::MAX, 1), None);
    }

    #[test]
    fn group_reply_to_bot_photo_is_addressed_to_the_bot() {
        // A group member replies to a picture the bot sent. The photo has no
        // text, but the message is still for the bot.
        let msg: Message = serde_json::from_value(serde_json::json!({
            "message_id": 200,
            "date": 1_700_000_100,
            "chat": { "id": -1001, "type": "group", "title": "grp" },
            "from": {
                "id": 7,
                "is_bot": false,
                "first_name": "user"
            },
            "text": "make another one",
            "reply_to_message": {
                "message_id": 199,
                "date": 1_700_000_000,
                "chat": { "id": -1001, "type": "group", "title": "grp" },
                "from": {
                    "id": 42,
                    "is_bot": true,
                    "first_name": "bot",
                    "username": "botname"
                },
                "photo": [{
                    "file_id": "x",
                    "file_unique_id": "y",
                    "width": 100,
                    "height": 100,
                    "file_size": 1000
                }]
            }
        }))
        .unwrap();

        let view = incoming_message(&msg);
        let reply = view.reply_to.as_ref().unwrap();
        assert_eq!(reply.sender_id, Some(42));
        assert!(reply.text.is_none());

        let me = BotIdentity {
            id: 42,
            username: "botname".to_string(),
        };
        let r = gtb_core::routing::classify(&view, &me);
        assert!(r.need_reaction);
        assert!(r.prev_turn.is_none());
    }

    #[test]
    fn mention_entities_are_extracted_in_order() {
        let entities = vec![
            MessageEntity {
                kind: MessageEntityKind::Mention,
                offset: 0,
                length: 6,
            },
            MessageEntity {
                kind: MessageEntityKind::Bold,
                offset: 7,
                length: 4,
            },
            MessageEntity {
                kind: MessageEntityKind::Mention,
                offset: 12,
                length: 6,
            },
        ];
        let slices = mention_slices("@alice also @bobby", &entities);
        assert_eq!(slices, vec!["@alice".to_string(), "@bobby".to_string()]);
    }
}
