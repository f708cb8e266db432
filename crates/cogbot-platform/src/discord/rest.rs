//! Discord REST API client — the `ChatPlatform` implementation.
//!
//! Every call goes through `request()`, which handles:
//! - `Authorization: Bot <token>`
//! - Rate-limit retry (HTTP 429, honouring `retry_after`)
//! - A bounded retry on 5xx responses
//! - 204 / empty bodies

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

use cogbot_core::types::{ChannelInfo, Embed, Emoji, GuildInfo, Message, User};

use super::model::{
    emoji_path_segment, parse_channel, parse_emoji, parse_guild, parse_message, parse_user,
};
use super::DISCORD_MAX_LEN;
use crate::base::{ChatPlatform, PlatformResult};
use crate::error::PlatformError;

/// Attempts before a 5xx response is returned as an error.
const MAX_ATTEMPTS: u32 = 3;

/// Attempts before a persistent 429 is returned as an error.
const MAX_RATE_LIMIT_ATTEMPTS: u32 = 5;

/// Longest `retry_after` waited out in place. Longer limits (channel
/// renames hit these) fail immediately so callers are not stalled.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Delay between 5xx retries.
const RETRY_DELAY: Duration = Duration::from_secs(1);

// ─────────────────────────────────────────────
// DiscordRest
// ─────────────────────────────────────────────

/// Discord REST client.
pub struct DiscordRest {
    /// Bot token from Discord Developer Portal.
    token: String,
    /// API base URL, e.g. `https://discord.com/api/v10`.
    api_base: String,
    /// HTTP client for REST API calls.
    http: reqwest::Client,
}

impl std::fmt::Debug for DiscordRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordRest")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl DiscordRest {
    /// Create a new REST client.
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> PlatformResult<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(PlatformError::MissingToken);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            token,
            api_base: api_base.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Issue a request, retrying on rate limits and server errors.
    ///
    /// Returns `Value::Null` for empty responses.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> PlatformResult<Value> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let mut req = self
                .http
                .request(method.clone(), self.url(path))
                .header("Authorization", format!("Bot {}", self.token));
            if let Some(body) = body {
                req = req.json(body);
            }
            let resp = req.send().await?;
            let status = resp.status();

            if status.is_success() {
                let text = resp.text().await?;
                if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                return serde_json::from_str(&text)
                    .map_err(|e| PlatformError::decode(path, e.to_string()));
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempts >= MAX_RATE_LIMIT_ATTEMPTS {
                    return Err(PlatformError::RateLimited {
                        path: path.to_string(),
                        attempts,
                    });
                }
                let body_text = resp.text().await.unwrap_or_default();
                let retry_after: f64 = serde_json::from_str::<Value>(&body_text)
                    .ok()
                    .and_then(|v| v["retry_after"].as_f64())
                    .unwrap_or(1.0)
                    .max(0.0);
                if retry_after > MAX_RETRY_AFTER.as_secs_f64() {
                    warn!(
                        path = %path,
                        retry_after_s = retry_after,
                        "discord rate limit too long to wait out"
                    );
                    return Err(PlatformError::RateLimited {
                        path: path.to_string(),
                        attempts,
                    });
                }
                warn!(
                    path = %path,
                    retry_after_s = retry_after,
                    attempt = attempts,
                    "discord rate limited"
                );
                tokio::time::sleep(Duration::from_secs_f64(retry_after)).await;
                continue;
            }

            if status.is_server_error() && attempts < MAX_ATTEMPTS {
                warn!(
                    path = %path,
                    status = %status,
                    attempt = attempts,
                    "discord server error, retrying in 1s"
                );
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(PlatformError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
    }

    /// GET that maps 404 to `None`.
    async fn get_optional(&self, path: &str) -> PlatformResult<Option<Value>> {
        match self.request(Method::GET, path, None).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn post_message(&self, channel_id: &str, body: Value) -> PlatformResult<Message> {
        let path = format!("/channels/{channel_id}/messages");
        let data = self.request(Method::POST, &path, Some(&body)).await?;
        parse_message(&data).ok_or_else(|| PlatformError::decode(&path, "malformed message"))
    }
}

/// Split a message into chunks respecting Discord's length limit.
/// Tries to split at newline boundaries and never splits inside a character.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        // Find last newline within the limit
        let split_at = remaining[..limit]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }

    chunks
}

#[async_trait]
impl ChatPlatform for DiscordRest {
    async fn current_user(&self) -> PlatformResult<User> {
        let path = "/users/@me";
        let data = self.request(Method::GET, path, None).await?;
        parse_user(&data).ok_or_else(|| PlatformError::decode(path, "malformed user"))
    }

    async fn get_guild(&self, guild_id: &str) -> PlatformResult<Option<GuildInfo>> {
        let data = self.get_optional(&format!("/guilds/{guild_id}")).await?;
        Ok(data.as_ref().and_then(parse_guild))
    }

    async fn guild_emojis(&self, guild_id: &str) -> PlatformResult<Vec<Emoji>> {
        let path = format!("/guilds/{guild_id}/emojis");
        let data = self.request(Method::GET, &path, None).await?;
        let items = data
            .as_array()
            .ok_or_else(|| PlatformError::decode(&path, "expected an array"))?;
        Ok(items.iter().filter_map(parse_emoji).collect())
    }

    async fn get_channel(&self, channel_id: &str) -> PlatformResult<Option<ChannelInfo>> {
        let data = self.get_optional(&format!("/channels/{channel_id}")).await?;
        Ok(data.as_ref().and_then(parse_channel))
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> PlatformResult<ChannelInfo> {
        let path = format!("/channels/{channel_id}");
        let data = self
            .request(Method::PATCH, &path, Some(&json!({ "name": name })))
            .await?;
        debug!(channel = %channel_id, name = %name, "discord channel renamed");
        parse_channel(&data).ok_or_else(|| PlatformError::decode(&path, "malformed channel"))
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> PlatformResult<Message> {
        let chunks = split_message(content, DISCORD_MAX_LEN);
        let mut last = None;
        for chunk in &chunks {
            last = Some(self.post_message(channel_id, json!({ "content": chunk })).await?);
        }
        debug!(channel = %channel_id, chunks = chunks.len(), "discord message sent");
        last.ok_or_else(|| PlatformError::decode("/messages", "nothing to send"))
    }

    async fn send_embed(
        &self,
        channel_id: &str,
        content: &str,
        embed: &Embed,
    ) -> PlatformResult<Message> {
        self.post_message(
            channel_id,
            json!({ "content": content, "embeds": [embed] }),
        )
        .await
    }

    async fn get_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> PlatformResult<Option<Message>> {
        let data = self
            .get_optional(&format!("/channels/{channel_id}/messages/{message_id}"))
            .await?;
        Ok(data.as_ref().and_then(parse_message))
    }

    async fn recent_messages(&self, channel_id: &str, limit: u8) -> PlatformResult<Vec<Message>> {
        let path = format!("/channels/{channel_id}/messages?limit={}", limit.clamp(1, 100));
        let data = self.request(Method::GET, &path, None).await?;
        let items = data
            .as_array()
            .ok_or_else(|| PlatformError::decode(&path, "expected an array"))?;
        Ok(items.iter().filter_map(parse_message).collect())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &Emoji,
    ) -> PlatformResult<()> {
        let path = format!(
            "/channels/{channel_id}/messages/{message_id}/reactions/{}/@me",
            emoji_path_segment(emoji)
        );
        self.request(Method::PUT, &path, None).await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> PlatformResult<()> {
        let path = format!("/channels/{channel_id}/messages/{message_id}");
        self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message_body(id: &str, content: &str) -> Value {
        json!({
            "id": id,
            "channel_id": "c1",
            "author": { "id": "bot", "username": "cogbot", "bot": true },
            "content": content,
            "timestamp": "2024-03-01T12:00:00+00:00"
        })
    }

    async fn client(server: &MockServer) -> DiscordRest {
        DiscordRest::new("test_token", server.uri()).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_token() {
        let err = DiscordRest::new("", "http://localhost").unwrap_err();
        assert!(matches!(err, PlatformError::MissingToken));
    }

    #[test]
    fn test_split_message_short() {
        let chunks = split_message("hello", 2000);
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn test_split_message_long() {
        let line = "hello world\n";
        let msg = line.repeat(200); // 2400 chars
        let chunks = split_message(&msg, 2000);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].len() <= 2000);
        assert!(chunks[0].ends_with('\n'));
    }

    #[test]
    fn test_split_message_no_newline() {
        let msg = "x".repeat(2500);
        let chunks = split_message(&msg, 2000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2000);
        assert_eq!(chunks[1].len(), 500);
    }

    #[test]
    fn test_split_message_multibyte() {
        // 4-byte characters never straddle a chunk boundary
        let msg = "💬".repeat(600);
        let chunks = split_message(&msg, 2000);
        assert!(chunks.iter().all(|c| c.len() <= 2000));
        assert_eq!(chunks.concat(), msg);
    }

    #[tokio::test]
    async fn test_send_message_sets_auth_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c1/messages"))
            .and(header("Authorization", "Bot test_token"))
            .and(body_partial_json(json!({ "content": "hi there" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body("m9", "hi there")))
            .mount(&server)
            .await;

        let msg = client(&server).await.send_message("c1", "hi there").await.unwrap();
        assert_eq!(msg.id, "m9");
        assert!(msg.author.bot);
    }

    #[tokio::test]
    async fn test_rate_limit_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c1/messages"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({ "retry_after": 0.01 })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/channels/c1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body("m1", "ok")))
            .mount(&server)
            .await;

        let msg = client(&server).await.send_message("c1", "ok").await.unwrap();
        assert_eq!(msg.id, "m1");
    }

    #[tokio::test]
    async fn test_rate_limit_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/@me"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({ "retry_after": 0.001 })),
            )
            .mount(&server)
            .await;

        let err = client(&server).await.current_user().await.unwrap_err();
        assert!(matches!(err, PlatformError::RateLimited { attempts: 5, .. }));
    }

    #[tokio::test]
    async fn test_long_rate_limit_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/channels/c1"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({ "retry_after": 300.0 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let err = client(&server)
            .await
            .rename_channel("c1", "💬help")
            .await
            .unwrap_err();

        assert!(matches!(err, PlatformError::RateLimited { attempts: 1, .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/channels/c1"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Missing Permissions"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .rename_channel("c1", "💬help")
            .await
            .unwrap_err();
        match err {
            PlatformError::Status { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "Missing Permissions");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rename_channel() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/channels/c1"))
            .and(body_partial_json(json!({ "name": "💬help" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "c1", "name": "💬help", "guild_id": "g1"
            })))
            .mount(&server)
            .await;

        let ch = client(&server).await.rename_channel("c1", "💬help").await.unwrap();
        assert_eq!(ch.name, "💬help");
    }

    #[tokio::test]
    async fn test_get_channel_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "code": 10003 })))
            .mount(&server)
            .await;

        let ch = client(&server).await.get_channel("missing").await.unwrap();
        assert!(ch.is_none());
    }

    #[tokio::test]
    async fn test_recent_messages_and_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/c1/messages"))
            .and(query_param("limit", "1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([message_body("m3", "newest")])),
            )
            .mount(&server)
            .await;

        let rest = client(&server).await;
        let latest = rest.latest_message("c1").await.unwrap().unwrap();
        assert_eq!(latest.id, "m3");
        assert!(rest.is_latest_message("c1", "m3").await.unwrap());
        assert!(!rest.is_latest_message("c1", "m2").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_reaction_encodes_emoji() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/channels/c1/messages/m1/reactions/%E2%9C%85/@me"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .add_reaction("c1", "m1", &Emoji::unicode("✅"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/channels/c1/messages/m1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).await.delete_message("c1", "m1").await.unwrap();
    }

    #[tokio::test]
    async fn test_guild_emojis() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/guilds/g1/emojis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "11", "name": "scooter" },
                { "id": "12", "name": "resolved" }
            ])))
            .mount(&server)
            .await;

        let emojis = client(&server).await.guild_emojis("g1").await.unwrap();
        assert_eq!(emojis.len(), 2);
        assert_eq!(emojis[0].name(), "scooter");
    }

    #[tokio::test]
    async fn test_send_embed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/c1/messages"))
            .and(body_partial_json(json!({
                "content": "<https://bugs.example.com/MC-1>",
                "embeds": [{ "title": "Crash", "color": 0xDB1F29 }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body("m5", "")))
            .mount(&server)
            .await;

        let embed = Embed {
            title: Some("Crash".into()),
            color: Some(0xDB1F29),
            ..Default::default()
        };
        let msg = client(&server)
            .await
            .send_embed("c1", "<https://bugs.example.com/MC-1>", &embed)
            .await
            .unwrap();
        assert_eq!(msg.id, "m5");
    }
}
