//! Attendance handlers: caller-scoped reads and the mark-attendance write
//! pipeline (scope check → uniqueness check → validation → persist → enrich).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use rota_audit::{AuditAction, AuditEvent};
use rota_events::{NotificationEvent, NotificationKind};
use rota_proto::{AttendanceList, Empty, MarkAttendanceRequest, UserDisplay, UserList};
use rota_storage::{
    attendance_day, AttendanceRecord, AttendanceStatus, MarkAttendanceParams, Role, Store,
    StoreError, User, UserId,
};

use crate::server::{extract_signature, RotaServer};
use crate::validate::{normalize_check_in, validation_error};

fn display_of(user: &User) -> UserDisplay {
    UserDisplay {
        id: user.id.0.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
    }
}

fn record_to_proto(
    record: &AttendanceRecord,
    subject: Option<UserDisplay>,
    marker: Option<UserDisplay>,
) -> rota_proto::AttendanceRecord {
    rota_proto::AttendanceRecord {
        id: record.id.0.to_string(),
        subject_id: record.subject_id.0.to_string(),
        subject_name: record.subject_name.clone(),
        status: record.status.as_str().to_string(),
        check_in_time: record.check_in.map(|t| t.timestamp()).unwrap_or(0),
        day: record.day.to_string(),
        marked_by: record.marked_by.0.to_string(),
        created_at: record.created_at.timestamp(),
        subject,
        marker,
    }
}

/// Fetch display fields for every user referenced by the records, one lookup
/// per unique id. A user that has left the directory yields no join; the
/// denormalized name snapshot still covers the record itself.
async fn display_joins(
    server: &RotaServer,
    records: &[AttendanceRecord],
) -> Result<HashMap<UserId, UserDisplay>, Status> {
    let mut joins = HashMap::new();
    for record in records {
        for id in [&record.subject_id, &record.marked_by] {
            if joins.contains_key(id) {
                continue;
            }
            match server.store.get_user_by_id(id).await {
                Ok(user) => {
                    joins.insert(id.clone(), display_of(&user));
                }
                Err(StoreError::NotFound) => {}
                Err(e) => return Err(RotaServer::store_failure("failed to join user display", e)),
            }
        }
    }
    Ok(joins)
}

async fn enriched(
    server: &RotaServer,
    records: Vec<AttendanceRecord>,
) -> Result<Vec<rota_proto::AttendanceRecord>, Status> {
    let joins = display_joins(server, &records).await?;
    Ok(records
        .iter()
        .map(|r| {
            record_to_proto(
                r,
                joins.get(&r.subject_id).cloned(),
                joins.get(&r.marked_by).cloned(),
            )
        })
        .collect())
}

pub async fn mark_attendance(
    server: &RotaServer,
    request: Request<MarkAttendanceRequest>,
) -> Result<Response<rota_proto::AttendanceRecord>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/MarkAttendance",
            &req_for_verify,
            &request_hash,
        )
        .await?;
    let req = request.into_inner();

    if !caller.role.is_privileged() {
        return Err(Status::permission_denied(
            "Only hr or admin callers may mark attendance",
        ));
    }

    let subject_id = Uuid::parse_str(&req.subject_id)
        .map(UserId)
        .map_err(|_| Status::invalid_argument("Invalid subject ID"))?;

    let scope = server.resolve_scope(&caller).await?;

    // Existence, scope membership and subject role collapse into one merged
    // rejection so callers cannot probe the directory through error codes.
    let subject = match server.store.get_user_by_id(&subject_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(RotaServer::subject_rejection()),
        Err(e) => return Err(RotaServer::store_failure("failed to get subject", e)),
    };
    if !scope.contains(&subject.id) || subject.role != Role::Employee {
        return Err(RotaServer::subject_rejection());
    }

    let day = attendance_day(Utc::now());

    // Friendly duplicate pre-check. The unique index on (subject, day) stays
    // the authoritative guard when two writers pass this check concurrently.
    match server.store.get_attendance_for_day(&subject.id, day).await {
        Ok(existing) => {
            return Err(Status::already_exists(format!(
                "Attendance already marked for {} on {}",
                existing.subject_name, existing.day
            )));
        }
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(RotaServer::store_failure("failed to check attendance", e)),
    }

    let status: AttendanceStatus = req.status.parse().map_err(|_| {
        Status::invalid_argument(format!("Invalid attendance status: {}", req.status))
    })?;
    let check_in = match req.check_in_time {
        0 => None,
        secs => Some(
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| Status::invalid_argument("Invalid check_in_time"))?,
        ),
    };
    let check_in =
        normalize_check_in(status, check_in).map_err(|failure| validation_error(&[failure]))?;

    let record = server
        .store
        .insert_attendance(&MarkAttendanceParams {
            subject_id: subject.id.clone(),
            subject_name: subject.name.clone(),
            status,
            check_in,
            day,
            marked_by: caller.id.clone(),
        })
        .await
        .map_err(|e| match e {
            // Lost the storage-level race to a concurrent writer; same
            // caller-visible outcome as the pre-check.
            StoreError::AlreadyExists => Status::already_exists(format!(
                "Attendance already marked for {} on {}",
                subject.name, day
            )),
            e => RotaServer::store_failure("failed to insert attendance", e),
        })?;

    server
        .audit(
            AuditEvent::new(AuditAction::AttendanceMark, caller.id.clone())
                .subject(subject.id.clone())
                .detail(status.as_str()),
        )
        .await;
    server
        .notify(
            &subject.id,
            NotificationEvent {
                kind: NotificationKind::AttendanceMarked,
                message: format!("Attendance marked {} for {}", status.as_str(), record.day),
                timestamp: Utc::now().timestamp(),
            },
        )
        .await;

    // Enrich with display joins of subject and marker so the client needs no
    // second round trip.
    Ok(Response::new(record_to_proto(
        &record,
        Some(display_of(&subject)),
        Some(display_of(&caller)),
    )))
}

pub async fn list_attendance(
    server: &RotaServer,
    request: Request<Empty>,
) -> Result<Response<AttendanceList>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/ListAttendance",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let scope = server.resolve_scope(&caller).await?;

    // An hr caller with zero provisioned users gets a consistent empty
    // result; record storage is never queried for an empty scope.
    if scope.is_empty() {
        return Ok(Response::new(AttendanceList { records: vec![] }));
    }

    let filter = scope.subject_filter();
    let records = server
        .store
        .list_attendance(filter.as_deref())
        .await
        .map_err(|e| RotaServer::store_failure("failed to list attendance", e))?;

    Ok(Response::new(AttendanceList {
        records: enriched(server, records).await?,
    }))
}

pub async fn list_today_attendance(
    server: &RotaServer,
    request: Request<Empty>,
) -> Result<Response<AttendanceList>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/ListTodayAttendance",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    if !caller.role.is_privileged() {
        return Err(Status::permission_denied(
            "Only hr or admin callers may list today's attendance",
        ));
    }

    let scope = server.resolve_scope(&caller).await?;
    if scope.is_empty() {
        return Ok(Response::new(AttendanceList { records: vec![] }));
    }

    let filter = scope.subject_filter();
    let records = server
        .store
        .list_attendance_for_day(attendance_day(Utc::now()), filter.as_deref())
        .await
        .map_err(|e| RotaServer::store_failure("failed to list today's attendance", e))?;

    Ok(Response::new(AttendanceList {
        records: enriched(server, records).await?,
    }))
}

pub async fn list_markable_subjects(
    server: &RotaServer,
    request: Request<Empty>,
) -> Result<Response<UserList>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/ListMarkableSubjects",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    if !caller.role.is_privileged() {
        return Err(Status::permission_denied(
            "Only hr or admin callers may list markable subjects",
        ));
    }

    let users = match caller.role {
        Role::Admin => server
            .store
            .list_users()
            .await
            .map_err(|e| RotaServer::store_failure("failed to list users", e))?,
        Role::Hr => server
            .store
            .list_users_created_by(&caller.id)
            .await
            .map_err(|e| RotaServer::store_failure("failed to list users", e))?,
        Role::Employee => vec![],
    };

    let users = users
        .into_iter()
        .filter(|u| u.role == Role::Employee)
        .map(|u| super::users::user_to_proto(&u))
        .collect();

    Ok(Response::new(UserList { users }))
}
