//! Meeting handlers: scheduling, scoped listing, status transitions.

use chrono::{DateTime, Utc};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use rota_audit::{AuditAction, AuditEvent};
use rota_events::{NotificationEvent, NotificationKind};
use rota_proto::{CreateMeetingRequest, Empty, MeetingList, UpdateMeetingStatusRequest};
use rota_storage::{
    CreateMeetingParams, Meeting, MeetingId, MeetingStatus, Role, Store, StoreError, UserId,
};

use crate::scope::Scope;
use crate::server::{extract_signature, RotaServer};
use crate::validate::{validate_meeting, validation_error, MeetingDraft, ValidationFailure};

fn meeting_to_proto(meeting: &Meeting) -> rota_proto::Meeting {
    rota_proto::Meeting {
        id: meeting.id.0.to_string(),
        title: meeting.title.clone(),
        description: meeting.description.clone().unwrap_or_default(),
        starts_at: meeting.starts_at.timestamp(),
        duration_minutes: meeting.duration_minutes,
        organizer_id: meeting.organizer_id.0.to_string(),
        attendee_ids: meeting
            .attendee_ids
            .iter()
            .map(|a| a.0.to_string())
            .collect(),
        status: meeting.status.as_str().to_string(),
        join_link: meeting.join_link.clone().unwrap_or_default(),
        created_at: meeting.created_at.timestamp(),
        updated_at: meeting.updated_at.timestamp(),
    }
}

pub async fn create_meeting(
    server: &RotaServer,
    request: Request<CreateMeetingRequest>,
) -> Result<Response<rota_proto::Meeting>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/CreateMeeting",
            &req_for_verify,
            &request_hash,
        )
        .await?;
    let req = request.into_inner();

    if !caller.role.is_privileged() {
        return Err(Status::permission_denied(
            "Only hr or admin callers may schedule meetings",
        ));
    }

    let attendee_ids = req
        .attendee_ids
        .iter()
        .map(|id| {
            Uuid::parse_str(id)
                .map(UserId)
                .map_err(|_| Status::invalid_argument(format!("Invalid attendee ID: {}", id)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scope = server.resolve_scope(&caller).await?;

    let starts_at = (req.starts_at > 0)
        .then(|| DateTime::from_timestamp(req.starts_at, 0))
        .flatten();

    let draft = MeetingDraft {
        title: &req.title,
        starts_at,
        duration_minutes: req.duration_minutes,
        attendee_ids: &attendee_ids,
    };
    let mut failures = match validate_meeting(&draft, &scope) {
        Ok(()) => Vec::new(),
        Err(failures) => failures,
    };

    // Admin scope is unrestricted, so membership says nothing about
    // existence; confirm each attendee against the directory. The failure is
    // the same out-of-scope kind so nothing leaks about who exists.
    if matches!(scope, Scope::Unrestricted) {
        for attendee in &attendee_ids {
            match server.store.get_user_by_id(attendee).await {
                Ok(_) => {}
                Err(StoreError::NotFound) => {
                    failures.push(ValidationFailure::OutOfScopeAttendee(attendee.clone()));
                }
                Err(e) => return Err(RotaServer::store_failure("failed to check attendee", e)),
            }
        }
    }
    if !failures.is_empty() {
        return Err(validation_error(&failures));
    }
    let starts_at = starts_at.ok_or_else(|| Status::invalid_argument("missing starts_at"))?;

    let meeting_id = MeetingId(Uuid::now_v7());
    let join_link = if req.join_link.trim().is_empty() {
        server
            .config
            .meeting_link_base
            .as_ref()
            .map(|base| format!("{}/{}", base, meeting_id.0))
    } else {
        Some(req.join_link.trim().to_string())
    };

    server
        .store
        .create_meeting(&CreateMeetingParams {
            id: meeting_id.clone(),
            title: req.title.trim().to_string(),
            description: if req.description.trim().is_empty() {
                None
            } else {
                Some(req.description.trim().to_string())
            },
            starts_at,
            duration_minutes: req.duration_minutes,
            organizer_id: caller.id.clone(),
            attendee_ids: attendee_ids.clone(),
            join_link,
        })
        .await
        .map_err(|e| RotaServer::store_failure("failed to create meeting", e))?;

    server
        .audit(
            AuditEvent::new(AuditAction::MeetingCreate, caller.id.clone())
                .detail(req.title.trim()),
        )
        .await;
    for attendee in &attendee_ids {
        server
            .notify(
                attendee,
                NotificationEvent {
                    kind: NotificationKind::MeetingScheduled,
                    message: format!("Meeting scheduled: {}", req.title.trim()),
                    timestamp: Utc::now().timestamp(),
                },
            )
            .await;
    }

    let meeting = server
        .store
        .get_meeting(&meeting_id)
        .await
        .map_err(|e| RotaServer::store_failure("failed to get meeting", e))?;

    Ok(Response::new(meeting_to_proto(&meeting)))
}

pub async fn list_meetings(
    server: &RotaServer,
    request: Request<Empty>,
) -> Result<Response<MeetingList>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/ListMeetings",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    // Admins see everything; everyone else sees meetings they organize or
    // attend. Employees are read-only participants.
    let meetings = match caller.role {
        Role::Admin => server.store.list_meetings().await,
        Role::Hr | Role::Employee => server.store.list_meetings_for_user(&caller.id).await,
    }
    .map_err(|e| RotaServer::store_failure("failed to list meetings", e))?;

    Ok(Response::new(MeetingList {
        meetings: meetings.iter().map(meeting_to_proto).collect(),
    }))
}

pub async fn update_meeting_status(
    server: &RotaServer,
    request: Request<UpdateMeetingStatusRequest>,
) -> Result<Response<rota_proto::Meeting>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/UpdateMeetingStatus",
            &req_for_verify,
            &request_hash,
        )
        .await?;
    let req = request.into_inner();

    let meeting_id = Uuid::parse_str(&req.meeting_id)
        .map(MeetingId)
        .map_err(|_| Status::invalid_argument("Invalid meeting ID"))?;

    let meeting = server
        .store
        .get_meeting(&meeting_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => Status::not_found("Meeting not found"),
            e => RotaServer::store_failure("failed to get meeting", e),
        })?;

    if meeting.organizer_id != caller.id && caller.role != Role::Admin {
        return Err(Status::permission_denied(
            "Only the organizer or an admin may change meeting status",
        ));
    }

    let target: MeetingStatus = req.status.parse().map_err(|_| {
        Status::invalid_argument(format!("Invalid meeting status: {}", req.status))
    })?;
    if !meeting.status.can_transition_to(&target) {
        return Err(Status::failed_precondition(format!(
            "Cannot change meeting status from {} to {}",
            meeting.status.as_str(),
            target.as_str()
        )));
    }

    server
        .store
        .set_meeting_status(&meeting_id, target)
        .await
        .map_err(|e| RotaServer::store_failure("failed to update meeting status", e))?;

    server
        .audit(
            AuditEvent::new(AuditAction::MeetingStatusChange, caller.id.clone())
                .detail(format!("{} -> {}", meeting.status.as_str(), target.as_str())),
        )
        .await;
    for attendee in &meeting.attendee_ids {
        server
            .notify(
                attendee,
                NotificationEvent {
                    kind: NotificationKind::MeetingStatusChanged,
                    message: format!("Meeting {} {}", meeting.title, target.as_str()),
                    timestamp: Utc::now().timestamp(),
                },
            )
            .await;
    }

    let mut updated = meeting;
    updated.status = target;
    Ok(Response::new(meeting_to_proto(&updated)))
}
