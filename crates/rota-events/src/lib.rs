//! Event bus abstraction for rota notification fan-out.
//!
//! This crate defines the EventBus trait used to notify users of attendance
//! and meeting changes inside the process. Delivery to clients (websockets,
//! push, badges) is a transport concern that lives outside this backend.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

use rota_storage::UserId;

/// Kind of notification event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    AttendanceMarked,
    MeetingScheduled,
    MeetingStatusChanged,
}

/// Event delivered to a single user
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: i64,
}

/// Error type for event bus operations
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of notification events
pub type EventStream = Pin<Box<dyn Stream<Item = NotificationEvent> + Send>>;

/// Event bus trait for publishing and subscribing to per-user notifications.
///
/// Implementations can be in-memory (single server) or backed by an external
/// broker for multi-replica deployments.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a notification to one user's channel.
    async fn publish(&self, user_id: &UserId, event: NotificationEvent)
        -> Result<(), EventBusError>;

    /// Subscribe to a user's notification channel.
    ///
    /// Returns a stream that yields events as they occur, until dropped.
    async fn subscribe(&self, user_id: &UserId) -> Result<EventStream, EventBusError>;
}
