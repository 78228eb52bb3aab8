//! Attendance types and the calendar-day normalization routine.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

use super::{AttendanceId, UserId};

/// Truncate an instant to its UTC calendar day.
///
/// This is the single normalization routine shared by the duplicate check and
/// the stored record value. The per-(subject, day) uniqueness invariant only
/// holds if every day boundary in the system comes from here.
pub fn attendance_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Attendance status for one subject on one day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    HalfDay,
}

/// Error type for parsing AttendanceStatus from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAttendanceStatusError(pub String);

impl std::fmt::Display for ParseAttendanceStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid attendance status: {}", self.0)
    }
}

impl std::error::Error for ParseAttendanceStatusError {}

impl FromStr for AttendanceStatus {
    type Err = ParseAttendanceStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "leave" => Ok(AttendanceStatus::Leave),
            "half-day" => Ok(AttendanceStatus::HalfDay),
            _ => Err(ParseAttendanceStatusError(s.to_string())),
        }
    }
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Leave => "leave",
            AttendanceStatus::HalfDay => "half-day",
        }
    }

    /// A check-in time is required when and only when the status is Present.
    pub fn requires_check_in(&self) -> bool {
        matches!(self, AttendanceStatus::Present)
    }
}

/// Attendance record. Immutable once persisted; there is no update or delete.
#[derive(Clone, Debug)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub subject_id: UserId,
    /// Display name snapshot taken at marking time, so later renames do not
    /// alter historical records.
    pub subject_name: String,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub day: NaiveDate,
    pub marked_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Parameters for inserting an attendance record
#[derive(Clone, Debug)]
pub struct MarkAttendanceParams {
    pub subject_id: UserId,
    pub subject_name: String,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub day: NaiveDate,
    pub marked_by: UserId,
}
