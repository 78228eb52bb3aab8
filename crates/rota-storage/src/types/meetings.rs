//! Meeting types.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::{MeetingId, UserId};

/// Meeting lifecycle status. Transitions are one-directional: a scheduled
/// meeting becomes completed or cancelled and never leaves either state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    Cancelled,
}

/// Error type for parsing MeetingStatus from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMeetingStatusError(pub String);

impl std::fmt::Display for ParseMeetingStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid meeting status: {}", self.0)
    }
}

impl std::error::Error for ParseMeetingStatusError {}

impl FromStr for MeetingStatus {
    type Err = ParseMeetingStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MeetingStatus::Scheduled),
            "completed" => Ok(MeetingStatus::Completed),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            _ => Err(ParseMeetingStatusError(s.to_string())),
        }
    }
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Completed => "completed",
            MeetingStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this status may transition to the target status.
    pub fn can_transition_to(&self, target: &MeetingStatus) -> bool {
        matches!(self, MeetingStatus::Scheduled)
            && matches!(target, MeetingStatus::Completed | MeetingStatus::Cancelled)
    }
}

/// Meeting record
#[derive(Clone, Debug)]
pub struct Meeting {
    pub id: MeetingId,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub organizer_id: UserId,
    pub attendee_ids: Vec<UserId>,
    pub status: MeetingStatus,
    /// Join link produced by the external link service; stored verbatim.
    pub join_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a meeting
#[derive(Clone, Debug)]
pub struct CreateMeetingParams {
    pub id: MeetingId,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub organizer_id: UserId,
    pub attendee_ids: Vec<UserId>,
    pub join_link: Option<String>,
}
