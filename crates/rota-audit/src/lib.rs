//! Audit logging abstraction for rota.
//!
//! This crate defines the `AuditLog` trait for persisting audit events
//! and the types representing auditable actions in the system.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use rota_storage::UserId;

/// Unique identifier for an audit log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditLogId(pub Uuid);

impl AuditLogId {
    /// Generate a new audit log ID using UUID v7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AuditLogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Categories of auditable actions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UserCreate,
    AttendanceMark,
    MeetingCreate,
    MeetingStatusChange,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::UserCreate => "user.create",
            AuditAction::AttendanceMark => "attendance.mark",
            AuditAction::MeetingCreate => "meeting.create",
            AuditAction::MeetingStatusChange => "meeting.status_change",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user.create" => Ok(AuditAction::UserCreate),
            "attendance.mark" => Ok(AuditAction::AttendanceMark),
            "meeting.create" => Ok(AuditAction::MeetingCreate),
            "meeting.status_change" => Ok(AuditAction::MeetingStatusChange),
            _ => Err(format!("invalid audit action: {}", s)),
        }
    }
}

/// One auditable event. Who did what, to whom, when.
#[derive(Clone, Debug)]
pub struct AuditEvent {
    pub id: AuditLogId,
    pub action: AuditAction,
    pub actor_id: UserId,
    pub subject_id: Option<UserId>,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, actor_id: UserId) -> Self {
        Self {
            id: AuditLogId::new(),
            action,
            actor_id,
            subject_id: None,
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn subject(mut self, subject_id: UserId) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Filter for querying audit logs (builder-style)
#[derive(Clone, Debug, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<UserId>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

impl AuditLogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor_id(mut self, actor_id: UserId) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Error type for audit log operations
#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("not found")]
    NotFound,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Audit log trait. Implemented by the storage backend so events land in the
/// same database as the records they describe.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist an audit event.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError>;

    /// Query audit events, newest first.
    async fn query(&self, filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError>;
}
