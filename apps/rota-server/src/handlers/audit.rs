//! Audit log handlers: admin-only queries over the audit trail.

use tonic::{Request, Response, Status};
use tracing::error;

use rota_audit::{AuditAction, AuditLog, AuditLogFilter};
use rota_proto::{AuditLogEntry, AuditLogList, ListAuditLogsRequest};
use rota_storage::{Role, UserId};

use crate::server::{extract_signature, RotaServer};

/// Maximum number of audit log entries that can be returned in a single
/// request. This prevents memory exhaustion from unbounded queries.
const MAX_AUDIT_LOG_LIMIT: u32 = 1000;

pub async fn list_audit_logs(
    server: &RotaServer,
    request: Request<ListAuditLogsRequest>,
) -> Result<Response<AuditLogList>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/ListAuditLogs",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    if caller.role != Role::Admin {
        return Err(Status::permission_denied(
            "Only admin callers may read audit logs",
        ));
    }

    let req = request.into_inner();

    let mut filter = AuditLogFilter::new();

    if let Some(actor_id) = req.actor_id {
        let actor_id = uuid::Uuid::parse_str(&actor_id)
            .map(UserId)
            .map_err(|_| Status::invalid_argument("Invalid actor_id format"))?;
        filter = filter.actor_id(actor_id);
    }

    if let Some(action) = req.action {
        let action: AuditAction = action
            .parse()
            .map_err(|_| Status::invalid_argument("Invalid action"))?;
        filter = filter.action(action);
    }

    // Apply limit with enforcement of maximum
    let limit = req
        .limit
        .map(|l| l.min(MAX_AUDIT_LOG_LIMIT))
        .unwrap_or(MAX_AUDIT_LOG_LIMIT);
    filter = filter.limit(limit);

    let entries = server
        .audit_log
        .query(filter)
        .await
        .map_err(|e| {
            error!("failed to query audit log: {}", e);
            Status::internal("audit log error")
        })?
        .into_iter()
        .map(|e| AuditLogEntry {
            id: e.id.to_string(),
            action: e.action.to_string(),
            actor_id: e.actor_id.0.to_string(),
            subject_id: e.subject_id.map(|s| s.0.to_string()).unwrap_or_default(),
            detail: e.detail.unwrap_or_default(),
            created_at: e.created_at.timestamp(),
        })
        .collect();

    Ok(Response::new(AuditLogList { entries }))
}
