//! Discord JSON payloads → core types.
//!
//! Payloads are read field by field from `serde_json::Value`; anything
//! missing a required field is dropped (`None`) rather than failing the
//! whole event.

use chrono::{DateTime, Utc};
use serde_json::Value;

use cogbot_core::bus::ReactionEvent;
use cogbot_core::types::{ChannelInfo, Emoji, GuildInfo, Message, ReactionCount, User};

pub(crate) fn parse_user(data: &Value) -> Option<User> {
    Some(User {
        id: data["id"].as_str()?.to_string(),
        name: data["username"].as_str().unwrap_or("").to_string(),
        bot: data["bot"].as_bool().unwrap_or(false),
    })
}

pub(crate) fn parse_guild(data: &Value) -> Option<GuildInfo> {
    Some(GuildInfo {
        id: data["id"].as_str()?.to_string(),
        name: data["name"].as_str().unwrap_or("").to_string(),
    })
}

pub(crate) fn parse_channel(data: &Value) -> Option<ChannelInfo> {
    Some(ChannelInfo {
        id: data["id"].as_str()?.to_string(),
        name: data["name"].as_str().unwrap_or("").to_string(),
        guild_id: data["guild_id"].as_str().map(String::from),
    })
}

pub(crate) fn parse_emoji(data: &Value) -> Option<Emoji> {
    let name = data["name"].as_str()?;
    let animated = data["animated"].as_bool().unwrap_or(false);
    Some(Emoji::from_parts(data["id"].as_str(), name, animated))
}

pub(crate) fn parse_message(data: &Value) -> Option<Message> {
    let timestamp = DateTime::parse_from_rfc3339(data["timestamp"].as_str()?)
        .ok()?
        .with_timezone(&Utc);

    let reactions = data["reactions"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|r| {
                    Some(ReactionCount {
                        emoji: parse_emoji(&r["emoji"])?,
                        count: r["count"].as_u64().unwrap_or(0) as u32,
                        me: r["me"].as_bool().unwrap_or(false),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Message {
        id: data["id"].as_str()?.to_string(),
        channel_id: data["channel_id"].as_str()?.to_string(),
        guild_id: data["guild_id"].as_str().map(String::from),
        author: parse_user(&data["author"])?,
        content: data["content"].as_str().unwrap_or("").to_string(),
        timestamp,
        reactions,
    })
}

/// `MESSAGE_REACTION_ADD` dispatch payload.
pub(crate) fn parse_reaction_add(data: &Value) -> Option<ReactionEvent> {
    let user_id = data["user_id"].as_str()?;
    // Guild reactions carry the member; DMs only carry the id.
    let reactor = parse_user(&data["member"]["user"]).unwrap_or_else(|| User::new(user_id, ""));

    Some(ReactionEvent {
        channel_id: data["channel_id"].as_str()?.to_string(),
        message_id: data["message_id"].as_str()?.to_string(),
        guild_id: data["guild_id"].as_str().map(String::from),
        reactor,
        emoji: parse_emoji(&data["emoji"])?,
    })
}

/// Path segment identifying an emoji in reaction endpoints.
pub(crate) fn emoji_path_segment(emoji: &Emoji) -> String {
    let raw = match emoji {
        Emoji::Unicode(s) => s.clone(),
        Emoji::Custom { id, name, .. } => format!("{name}:{id}"),
    };
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_json() -> Value {
        json!({
            "id": "m1",
            "channel_id": "c1",
            "guild_id": "g1",
            "author": { "id": "u1", "username": "alice" },
            "content": "help me",
            "timestamp": "2024-03-01T12:00:00.000000+00:00",
            "reactions": [
                { "emoji": { "id": null, "name": "🛴" }, "count": 1, "me": false },
                { "emoji": { "id": "77", "name": "done" }, "count": 3, "me": true }
            ]
        })
    }

    #[test]
    fn test_parse_message() {
        let msg = parse_message(&message_json()).unwrap();
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.channel_id, "c1");
        assert_eq!(msg.guild_id.as_deref(), Some("g1"));
        assert_eq!(msg.author.name, "alice");
        assert!(!msg.author.bot);
        assert_eq!(msg.content, "help me");
        assert_eq!(msg.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
        assert_eq!(msg.reaction_count(&Emoji::unicode("🛴")), 1);
        assert_eq!(
            msg.reaction_count(&Emoji::custom("77", "done")),
            3
        );
    }

    #[test]
    fn test_parse_message_missing_author() {
        let mut data = message_json();
        data["author"] = Value::Null;
        assert!(parse_message(&data).is_none());
    }

    #[test]
    fn test_parse_message_bad_timestamp() {
        let mut data = message_json();
        data["timestamp"] = json!("yesterday");
        assert!(parse_message(&data).is_none());
    }

    #[test]
    fn test_parse_reaction_add_guild() {
        let data = json!({
            "user_id": "u2",
            "channel_id": "c1",
            "message_id": "m1",
            "guild_id": "g1",
            "member": { "user": { "id": "u2", "username": "bob" } },
            "emoji": { "id": null, "name": "🛴" }
        });
        let ev = parse_reaction_add(&data).unwrap();
        assert_eq!(ev.reactor.name, "bob");
        assert_eq!(ev.guild_id.as_deref(), Some("g1"));
        assert_eq!(ev.emoji, Emoji::unicode("🛴"));
    }

    #[test]
    fn test_parse_reaction_add_dm() {
        let data = json!({
            "user_id": "u2",
            "channel_id": "dm",
            "message_id": "m1",
            "emoji": { "id": null, "name": "✅" }
        });
        let ev = parse_reaction_add(&data).unwrap();
        assert_eq!(ev.reactor.id, "u2");
        assert!(ev.guild_id.is_none());
    }

    #[test]
    fn test_parse_channel() {
        let data = json!({ "id": "c1", "name": "💬help-1", "guild_id": "g1" });
        let ch = parse_channel(&data).unwrap();
        assert_eq!(ch.name, "💬help-1");
        assert_eq!(ch.guild_id.as_deref(), Some("g1"));
        assert!(parse_channel(&json!({ "name": "no-id" })).is_none());
    }

    #[test]
    fn test_parse_animated_emoji() {
        let emoji = parse_emoji(&json!({ "id": "42", "name": "party", "animated": true })).unwrap();
        assert_eq!(emoji.to_string(), "<a:party:42>");
        let plain = parse_emoji(&json!({ "id": "42", "name": "party" })).unwrap();
        assert_eq!(plain.to_string(), "<:party:42>");
    }

    #[test]
    fn test_emoji_path_segment() {
        assert_eq!(emoji_path_segment(&Emoji::unicode("✅")), "%E2%9C%85");
        assert_eq!(
            emoji_path_segment(&Emoji::custom("77", "done")),
            "done%3A77"
        );
    }
}
