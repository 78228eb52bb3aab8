//! In-memory event bus implementation using tokio broadcast channels.
//!
//! Suitable for single-server deployments, development and testing. With
//! multiple server replicas, events do not cross process boundaries; use a
//! broker-backed bus instead.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use rota_events::{EventBus, EventBusError, EventStream, NotificationEvent};
use rota_storage::UserId;

const CHANNEL_CAPACITY: usize = 100;

/// In-memory event bus using one tokio broadcast channel per user.
pub struct MemoryEventBus {
    channels: Arc<DashMap<UserId, broadcast::Sender<NotificationEvent>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Get or create the broadcast channel for a user
    fn get_or_create_channel(&self, user_id: &UserId) -> broadcast::Sender<NotificationEvent> {
        self.channels
            .entry(user_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(
        &self,
        user_id: &UserId,
        event: NotificationEvent,
    ) -> Result<(), EventBusError> {
        let tx = self.get_or_create_channel(user_id);

        // Ignore error if no receivers (this is fine)
        let _ = tx.send(event);

        Ok(())
    }

    async fn subscribe(&self, user_id: &UserId) -> Result<EventStream, EventBusError> {
        let tx = self.get_or_create_channel(user_id);
        let rx = tx.subscribe();

        // Filter out lagged errors (receiver fell behind; it should resync)
        let stream = BroadcastStream::new(rx).filter_map(|result| result.ok());

        Ok(Box::pin(stream))
    }
}
