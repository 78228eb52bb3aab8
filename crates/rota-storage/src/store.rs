//! The Store trait that backends implement.

use chrono::NaiveDate;

use crate::types::*;
use crate::StoreError;

/// The storage trait the server depends on.
///
/// List methods over attendance take an optional subject filter: `None` means
/// unrestricted (admin scope), `Some(ids)` restricts rows to those subjects.
/// Callers resolve scope before querying; an empty resolved scope must not
/// reach the store at all.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Users ──────────────────────────────────────────

    /// Create a new user (returns the generated ID).
    async fn create_user(&self, params: &CreateUserParams) -> Result<UserId, StoreError>;

    /// Get user by ID.
    async fn get_user_by_id(&self, user_id: &UserId) -> Result<User, StoreError>;

    /// Get user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// List all users.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// List users provisioned by the given creator (the creator's ownership
    /// children; never recursive, the hierarchy is two levels by construction).
    async fn list_users_created_by(&self, creator: &UserId) -> Result<Vec<User>, StoreError>;

    // ───────────────────────────────────── Attendance ─────────────────────────────────────

    /// Insert an attendance record for (subject, day).
    ///
    /// Backends must enforce a uniqueness constraint on the (subject, day)
    /// pair and return `StoreError::AlreadyExists` when it is violated. This
    /// constraint, not the caller's pre-check, is what closes the concurrent
    /// check-then-write race.
    async fn insert_attendance(
        &self,
        params: &MarkAttendanceParams,
    ) -> Result<AttendanceRecord, StoreError>;

    /// Get the attendance record for a subject on a given day, if any.
    async fn get_attendance_for_day(
        &self,
        subject: &UserId,
        day: NaiveDate,
    ) -> Result<AttendanceRecord, StoreError>;

    /// List attendance records, newest day first.
    async fn list_attendance(
        &self,
        subjects: Option<&[UserId]>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// List attendance records for a single day.
    async fn list_attendance_for_day(
        &self,
        day: NaiveDate,
        subjects: Option<&[UserId]>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    // ───────────────────────────────────── Meetings ───────────────────────────────────────

    /// Create a meeting with its attendee set (atomically).
    async fn create_meeting(&self, params: &CreateMeetingParams) -> Result<MeetingId, StoreError>;

    /// Get a meeting by ID.
    async fn get_meeting(&self, meeting_id: &MeetingId) -> Result<Meeting, StoreError>;

    /// List all meetings, newest start time first.
    async fn list_meetings(&self) -> Result<Vec<Meeting>, StoreError>;

    /// List meetings where the user is the organizer or an attendee.
    async fn list_meetings_for_user(&self, user_id: &UserId) -> Result<Vec<Meeting>, StoreError>;

    /// Set a meeting's status. Transition legality is checked by the caller;
    /// the store only persists.
    async fn set_meeting_status(
        &self,
        meeting_id: &MeetingId,
        status: MeetingStatus,
    ) -> Result<(), StoreError>;
}
