//! Strongly-typed identifiers (avoid mixing strings/UUIDs arbitrarily).

use uuid::Uuid;

/// User identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

/// Attendance record identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttendanceId(pub Uuid);

/// Meeting identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeetingId(pub Uuid);
