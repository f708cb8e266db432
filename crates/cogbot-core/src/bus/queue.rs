//! Async event bus between the gateway and the bot loop.
//!
//! Uses a tokio::sync::mpsc bounded channel. There is a single consumer (the
//! bot loop), which is what serializes event handling.

use super::types::PlatformEvent;
use tokio::sync::mpsc;

/// The event bus connecting the gateway → bot loop.
///
/// - The gateway publishes every dispatch it understands
/// - The bot loop consumes events one at a time
pub struct EventBus {
    tx: mpsc::Sender<PlatformEvent>,
    rx: tokio::sync::Mutex<mpsc::Receiver<PlatformEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(buffer_size: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer_size);
        EventBus {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Publish an event (waits when the buffer is full).
    pub async fn publish(
        &self,
        event: PlatformEvent,
    ) -> Result<(), mpsc::error::SendError<PlatformEvent>> {
        self.tx.send(event).await
    }

    /// Consume the next event (blocks until available).
    /// Returns None if all senders are dropped.
    pub async fn consume(&self) -> Option<PlatformEvent> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    /// Get a clone of the sender.
    pub fn sender(&self) -> mpsc::Sender<PlatformEvent> {
        self.tx.clone()
    }
}
