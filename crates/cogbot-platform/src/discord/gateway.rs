//! Discord Gateway v10 WebSocket client.
//!
//! Keeps one session alive (heartbeat, resume, reconnect) and publishes the
//! dispatches the cogs care about onto the [`EventBus`].

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use cogbot_core::bus::{EventBus, PlatformEvent};

use super::model::{parse_channel, parse_message, parse_reaction_add, parse_user};
use crate::base::PlatformResult;
use crate::error::PlatformError;

/// GUILDS(1) + GUILD_MESSAGES(512) + GUILD_MESSAGE_REACTIONS(1024) + MESSAGE_CONTENT(32768).
pub const DEFAULT_INTENTS: u64 = 1 + 512 + 1024 + 32768;

/// Delay before reconnecting after a failed session.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

// Gateway opcodes
const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RESUME: u64 = 6;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;
const OP_HEARTBEAT_ACK: u64 = 11;

// ─────────────────────────────────────────────
// DiscordGateway
// ─────────────────────────────────────────────

pub struct DiscordGateway {
    token: String,
    gateway_url: String,
    intents: u64,
    bus: Arc<EventBus>,
    shutdown: Arc<Notify>,
    /// Last sequence number seen (for heartbeat/resume).
    seq: Mutex<Option<u64>>,
    /// Session ID (for resume).
    session_id: Mutex<Option<String>>,
    /// Resume gateway URL.
    resume_url: Mutex<Option<String>>,
}

impl DiscordGateway {
    pub fn new(
        token: impl Into<String>,
        gateway_url: impl Into<String>,
        bus: Arc<EventBus>,
    ) -> PlatformResult<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(PlatformError::MissingToken);
        }
        Ok(Self {
            token,
            gateway_url: gateway_url.into(),
            intents: DEFAULT_INTENTS,
            bus,
            shutdown: Arc::new(Notify::new()),
            seq: Mutex::new(None),
            session_id: Mutex::new(None),
            resume_url: Mutex::new(None),
        })
    }

    /// Ask a running gateway to close its session and return.
    pub fn stop(&self) {
        info!("stopping discord gateway");
        self.shutdown.notify_waiters();
    }

    /// Run sessions until `stop()` is called, reconnecting on failure.
    pub async fn run(&self) -> PlatformResult<()> {
        info!(intents = self.intents, "starting discord gateway (v10)");
        loop {
            match self.session().await {
                Ok(()) => {
                    info!("discord gateway session ended normally");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "discord gateway error, reconnecting in 5s");
                    tokio::select! {
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                        _ = self.shutdown.notified() => {
                            info!("discord shutdown during reconnect wait");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// A single WebSocket session. `Ok` means shut down, `Err` means reconnect.
    async fn session(&self) -> PlatformResult<()> {
        let url = self
            .resume_url
            .lock()
            .await
            .clone()
            .unwrap_or_else(|| self.gateway_url.clone());

        debug!(url = %url, "connecting to discord gateway");
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(Box::new)?;
        let (mut write, mut read) = ws_stream.split();

        let mut heartbeat: Option<Interval> = None;
        let mut acked = true;

        loop {
            tokio::select! {
                msg = read.next() => {
                    let text = match msg {
                        Some(Ok(WsMessage::Text(t))) => t.to_string(),
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(frame = ?frame, "discord ws closed by server");
                            return Err(PlatformError::Gateway("closed by server".into()));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            error!(error = %e, "discord ws read error");
                            return Err(Box::new(e).into());
                        }
                        None => return Err(PlatformError::Gateway("stream ended".into())),
                    };

                    let payload: Value = match serde_json::from_str(&text) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(error = %e, "discord ws invalid json");
                            continue;
                        }
                    };

                    if let Some(s) = payload["s"].as_u64() {
                        *self.seq.lock().await = Some(s);
                    }

                    match payload["op"].as_u64().unwrap_or(u64::MAX) {
                        OP_HELLO => {
                            let interval_ms = payload["d"]["heartbeat_interval"]
                                .as_u64()
                                .unwrap_or(41250);
                            debug!(interval_ms, "discord HELLO received");

                            let period = Duration::from_millis(interval_ms);
                            let jitter = period.mul_f64(rand_jitter());
                            let start = Instant::now() + jitter;
                            let mut ticker = tokio::time::interval_at(start, period);
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            heartbeat = Some(ticker);
                            acked = true;

                            let session_id = self.session_id.lock().await.clone();
                            let seq = *self.seq.lock().await;
                            let hello = self.handshake(session_id.as_deref(), seq);
                            write
                                .send(WsMessage::text(hello.to_string()))
                                .await
                                .map_err(Box::new)?;
                        }
                        OP_DISPATCH => {
                            let event = payload["t"].as_str().unwrap_or("");
                            let data = &payload["d"];
                            if event == "READY" {
                                if let Some(sid) = data["session_id"].as_str() {
                                    *self.session_id.lock().await = Some(sid.to_string());
                                }
                                if let Some(url) = data["resume_gateway_url"].as_str() {
                                    *self.resume_url.lock().await = Some(url.to_string());
                                }
                            }
                            if event == "RESUMED" {
                                info!("discord session resumed");
                            }
                            if let Some(ev) = translate_dispatch(event, data) {
                                if self.bus.publish(ev).await.is_err() {
                                    warn!("event bus closed, ending gateway session");
                                    return Ok(());
                                }
                            } else {
                                debug!(event, "discord event (unhandled)");
                            }
                        }
                        OP_HEARTBEAT_ACK => acked = true,
                        OP_HEARTBEAT => {
                            // Server requesting immediate heartbeat
                            let seq = *self.seq.lock().await;
                            write
                                .send(WsMessage::text(heartbeat_payload(seq).to_string()))
                                .await
                                .map_err(Box::new)?;
                        }
                        OP_RECONNECT => {
                            info!("discord server requested reconnect");
                            return Err(PlatformError::Gateway("reconnect requested".into()));
                        }
                        OP_INVALID_SESSION => {
                            let resumable = payload["d"].as_bool().unwrap_or(false);
                            warn!(resumable, "discord invalid session");
                            if !resumable {
                                *self.session_id.lock().await = None;
                                *self.resume_url.lock().await = None;
                            }
                            return Err(PlatformError::Gateway("invalid session".into()));
                        }
                        _ => {}
                    }
                }
                _ = next_tick(&mut heartbeat) => {
                    if !acked {
                        warn!("discord heartbeat not ACKed, reconnecting");
                        return Err(PlatformError::Gateway("heartbeat not acknowledged".into()));
                    }
                    acked = false;
                    let seq = *self.seq.lock().await;
                    write
                        .send(WsMessage::text(heartbeat_payload(seq).to_string()))
                        .await
                        .map_err(Box::new)?;
                }
                _ = self.shutdown.notified() => {
                    info!("discord shutdown signal received");
                    let _ = write.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    /// IDENTIFY for a fresh session, RESUME when a session id is known.
    fn handshake(&self, session_id: Option<&str>, seq: Option<u64>) -> Value {
        match session_id {
            Some(sid) => json!({
                "op": OP_RESUME,
                "d": {
                    "token": self.token,
                    "session_id": sid,
                    "seq": seq
                }
            }),
            None => json!({
                "op": OP_IDENTIFY,
                "d": {
                    "token": self.token,
                    "intents": self.intents,
                    "properties": {
                        "os": std::env::consts::OS,
                        "browser": "cogbot",
                        "device": "cogbot"
                    }
                }
            }),
        }
    }
}

fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": OP_HEARTBEAT, "d": seq })
}

/// Resolves on the next heartbeat tick, or never before HELLO.
async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Map a dispatch to a bus event. Unknown or malformed dispatches yield `None`.
pub(crate) fn translate_dispatch(event: &str, data: &Value) -> Option<PlatformEvent> {
    match event {
        "READY" => {
            let user = parse_user(&data["user"])?;
            info!(user = %user.name, "discord bot READY");
            Some(PlatformEvent::Ready { user })
        }
        "MESSAGE_CREATE" => parse_message(data).map(PlatformEvent::MessageCreated),
        "MESSAGE_REACTION_ADD" => parse_reaction_add(data).map(PlatformEvent::ReactionAdded),
        "CHANNEL_UPDATE" => parse_channel(data).map(PlatformEvent::ChannelUpdated),
        _ => None,
    }
}

/// Simple jitter: a random fraction between 0.0 and 1.0 for heartbeat.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos as f64) / 1_000_000_000.0
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> DiscordGateway {
        DiscordGateway::new("tok", "wss://example.invalid", Arc::new(EventBus::new(8))).unwrap()
    }

    #[test]
    fn test_intents() {
        assert_eq!(DEFAULT_INTENTS, 34305);
    }

    #[test]
    fn test_new_rejects_empty_token() {
        let res = DiscordGateway::new("", "wss://x", Arc::new(EventBus::new(1)));
        assert!(matches!(res, Err(PlatformError::MissingToken)));
    }

    #[test]
    fn test_rand_jitter_range() {
        let j = rand_jitter();
        assert!((0.0..1.0).contains(&j));
    }

    #[test]
    fn test_handshake_identify() {
        let payload = gateway().handshake(None, None);
        assert_eq!(payload["op"], OP_IDENTIFY);
        assert_eq!(payload["d"]["token"], "tok");
        assert_eq!(payload["d"]["intents"], DEFAULT_INTENTS);
    }

    #[test]
    fn test_handshake_resume() {
        let payload = gateway().handshake(Some("sess"), Some(42));
        assert_eq!(payload["op"], OP_RESUME);
        assert_eq!(payload["d"]["session_id"], "sess");
        assert_eq!(payload["d"]["seq"], 42);
    }

    #[test]
    fn test_heartbeat_payload() {
        assert_eq!(heartbeat_payload(None), json!({ "op": 1, "d": null }));
        assert_eq!(heartbeat_payload(Some(7)), json!({ "op": 1, "d": 7 }));
    }

    #[test]
    fn test_translate_ready() {
        let data = json!({
            "session_id": "s",
            "user": { "id": "42", "username": "cogbot", "bot": true }
        });
        match translate_dispatch("READY", &data) {
            Some(PlatformEvent::Ready { user }) => {
                assert_eq!(user.id, "42");
                assert!(user.bot);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_translate_message_create() {
        let data = json!({
            "id": "m1",
            "channel_id": "c1",
            "guild_id": "g1",
            "author": { "id": "u1", "username": "alice" },
            "content": "hello",
            "timestamp": "2024-03-01T12:00:00+00:00"
        });
        let ev = translate_dispatch("MESSAGE_CREATE", &data).unwrap();
        assert_eq!(ev.kind(), "message_created");
    }

    #[test]
    fn test_translate_reaction_and_channel() {
        let reaction = json!({
            "user_id": "u1",
            "channel_id": "c1",
            "message_id": "m1",
            "guild_id": "g1",
            "emoji": { "id": null, "name": "🛴" }
        });
        assert_eq!(
            translate_dispatch("MESSAGE_REACTION_ADD", &reaction).map(|e| e.kind()),
            Some("reaction_added")
        );

        let channel = json!({ "id": "c1", "name": "⏰help", "guild_id": "g1" });
        assert_eq!(
            translate_dispatch("CHANNEL_UPDATE", &channel).map(|e| e.kind()),
            Some("channel_updated")
        );
    }

    #[test]
    fn test_translate_ignores_unknown_and_malformed() {
        assert!(translate_dispatch("TYPING_START", &json!({})).is_none());
        assert!(translate_dispatch("MESSAGE_CREATE", &json!({ "id": "m1" })).is_none());
    }

    #[tokio::test]
    async fn test_next_tick_pending_without_interval() {
        let mut none = None;
        let res = tokio::time::timeout(Duration::from_millis(20), next_tick(&mut none)).await;
        assert!(res.is_err());

        let mut some = Some(tokio::time::interval(Duration::from_millis(5)));
        let res = tokio::time::timeout(Duration::from_millis(200), next_tick(&mut some)).await;
        assert!(res.is_ok());
    }
}
