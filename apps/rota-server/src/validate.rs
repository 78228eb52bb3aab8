//! Structural and conditional validation for writes.

use std::fmt;

use chrono::{DateTime, Utc};
use tonic::Status;

use rota_storage::{AttendanceStatus, UserId};

use crate::scope::Scope;

/// A single validation violation, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationFailure {
    MissingField(&'static str),
    InvalidEnum { field: &'static str, value: String },
    ConditionalFieldMissing(&'static str),
    EmptyAttendeeSet,
    OutOfScopeAttendee(UserId),
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::MissingField(field) => write!(f, "missing-field: {}", field),
            ValidationFailure::InvalidEnum { field, value } => {
                write!(f, "invalid-enum: {} = {:?}", field, value)
            }
            ValidationFailure::ConditionalFieldMissing(field) => {
                write!(f, "conditional-field-missing: {}", field)
            }
            ValidationFailure::EmptyAttendeeSet => write!(f, "empty-attendee-set"),
            ValidationFailure::OutOfScopeAttendee(id) => {
                write!(f, "out-of-scope-attendee: {}", id.0)
            }
        }
    }
}

/// Collapse violations into one caller-facing rejection listing all of them,
/// so a caller can correct every problem in a single round trip.
pub fn validation_error(failures: &[ValidationFailure]) -> Status {
    let detail = failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Status::invalid_argument(detail)
}

/// A check-in time is required iff the status is present. Any check-in sent
/// with another status is cleared here, never persisted.
pub fn normalize_check_in(
    status: AttendanceStatus,
    check_in: Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, ValidationFailure> {
    if status.requires_check_in() {
        match check_in {
            Some(at) => Ok(Some(at)),
            None => Err(ValidationFailure::ConditionalFieldMissing("check_in_time")),
        }
    } else {
        Ok(None)
    }
}

/// Raw meeting fields before validation.
pub struct MeetingDraft<'a> {
    pub title: &'a str,
    pub starts_at: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    pub attendee_ids: &'a [UserId],
}

/// Validate a meeting draft against the organizer's scope, reporting every
/// violation at once. Scope membership is checked at submission time only.
pub fn validate_meeting(
    draft: &MeetingDraft<'_>,
    scope: &Scope,
) -> Result<(), Vec<ValidationFailure>> {
    let mut failures = Vec::new();

    if draft.title.trim().is_empty() {
        failures.push(ValidationFailure::MissingField("title"));
    }
    if draft.starts_at.is_none() {
        failures.push(ValidationFailure::MissingField("starts_at"));
    }
    if draft.duration_minutes == 0 {
        failures.push(ValidationFailure::MissingField("duration_minutes"));
    }
    if draft.attendee_ids.is_empty() {
        failures.push(ValidationFailure::EmptyAttendeeSet);
    }
    for attendee in draft.attendee_ids {
        if !scope.contains(attendee) {
            failures.push(ValidationFailure::OutOfScopeAttendee(attendee.clone()));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}
