use std::sync::Arc;

use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use prost::Message;
use sha2::{Digest, Sha256};
use tonic::Status;
use tracing::{error, warn};

use rota_audit::{AuditEvent, AuditLog};
use rota_events::{EventBus, NotificationEvent};
use rota_storage::{Store, StoreError, User, UserId};
use rota_store_sqlite::SqliteStore;

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct RotaServer {
    pub store: Arc<dyn Store>,
    pub audit_log: Arc<dyn AuditLog>,
    pub events: Arc<dyn EventBus>,
    pub config: ServerConfig,
}

impl RotaServer {
    pub fn new_sqlite(
        store: Arc<SqliteStore>,
        events: Arc<dyn EventBus>,
        config: ServerConfig,
    ) -> Self {
        Self {
            store: store.clone(),
            audit_log: store,
            events,
            config,
        }
    }

    /// The merged not-found/forbidden rejection for subject lookups. Callers
    /// must not be able to tell a missing subject from one outside their
    /// scope, or they could probe the org structure through error codes.
    pub fn subject_rejection() -> Status {
        Status::not_found("Subject not found or not accessible")
    }

    /// Map an unexpected storage failure. Full detail goes to the server log;
    /// the caller only sees an opaque internal error.
    pub fn store_failure(context: &'static str, e: StoreError) -> Status {
        error!("{}: {}", context, e);
        Status::internal("storage error")
    }

    /// Verify the signature and return the calling user.
    /// The signature must cover: method_name + request_hash + timestamp
    /// This prevents replay attacks across different methods or with different request bodies.
    pub async fn verify_signature_and_get_user<T: Message>(
        &self,
        user_id: &UserId,
        timestamp: i64,
        signature: &[u8],
        method: &str,
        request: &T,
        provided_hash: &[u8],
    ) -> Result<User, Status> {
        // Check timestamp freshness (replay protection)
        let now = Utc::now().timestamp();
        let age = now - timestamp;

        if age > 60 {
            return Err(Status::unauthenticated(
                "Request timestamp too old (>60s), possible replay attack",
            ));
        }
        if age < -30 {
            return Err(Status::unauthenticated(
                "Request timestamp too far in future (>30s), check clock sync",
            ));
        }

        // Compute expected hash and verify it matches provided hash
        let body_bytes = request.encode_to_vec();
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(&body_bytes);
        let expected_hash = hasher.finalize();

        if &expected_hash[..] != provided_hash {
            return Err(Status::unauthenticated(
                "Request hash mismatch - body may have been tampered",
            ));
        }

        let user = self
            .store
            .get_user_by_id(user_id)
            .await
            .map_err(|_| Status::unauthenticated("Invalid user"))?;

        let verifying_key = VerifyingKey::from_bytes(
            user.public_key
                .as_slice()
                .try_into()
                .map_err(|_| Status::unauthenticated("Invalid public key length"))?,
        )
        .map_err(|_| Status::unauthenticated("Invalid public key"))?;

        let sig = Signature::from_bytes(
            signature
                .try_into()
                .map_err(|_| Status::unauthenticated("Invalid signature length"))?,
        );

        // Build the expected signed message: method + hash + timestamp
        let mut message = Vec::new();
        message.extend_from_slice(method.as_bytes());
        message.extend_from_slice(provided_hash);
        message.extend_from_slice(&timestamp.to_le_bytes());

        verifying_key
            .verify(&message, &sig)
            .map_err(|_| Status::unauthenticated("Invalid signature"))?;

        Ok(user)
    }

    /// Record an audit event. Failures are logged but do not fail the operation.
    pub async fn audit(&self, event: AuditEvent) {
        if !self.config.audit_enabled {
            return;
        }
        if let Err(e) = self.audit_log.record(event).await {
            warn!("failed to record audit event: {}", e);
        }
    }

    /// Publish a notification. Failures are logged but do not fail the operation.
    pub async fn notify(&self, user_id: &UserId, event: NotificationEvent) {
        if let Err(e) = self.events.publish(user_id, event).await {
            warn!("failed to publish notification: {}", e);
        }
    }
}

/// Helper function to extract signature metadata from gRPC request headers.
/// Returns (user_id, timestamp, signature, request_hash).
pub fn extract_signature<T>(
    request: &tonic::Request<T>,
) -> Result<(UserId, i64, Vec<u8>, Vec<u8>), Status> {
    let metadata = request.metadata();

    let user_id_str = metadata
        .get("user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing user-id metadata"))?;

    let user_id = uuid::Uuid::parse_str(user_id_str)
        .map(UserId)
        .map_err(|_| Status::unauthenticated("Invalid user-id format"))?;

    let timestamp_str = metadata
        .get("timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing timestamp metadata"))?;

    let timestamp = timestamp_str
        .parse::<i64>()
        .map_err(|_| Status::unauthenticated("Invalid timestamp format"))?;

    let signature_str = metadata
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing signature metadata"))?;

    let signature = hex::decode(signature_str)
        .map_err(|_| Status::unauthenticated("Invalid signature format"))?;

    let request_hash_str = metadata
        .get("request-hash")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Status::unauthenticated("Missing request-hash metadata"))?;

    let request_hash = hex::decode(request_hash_str)
        .map_err(|_| Status::unauthenticated("Invalid request-hash format"))?;

    Ok((user_id, timestamp, signature, request_hash))
}
