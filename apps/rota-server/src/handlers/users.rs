//! User handlers: provisioning and directory reads.

use tonic::{Request, Response, Status};
use uuid::Uuid;

use rota_audit::{AuditAction, AuditEvent};
use rota_proto::{CreateUserRequest, Empty, GetUserRequest, UserList};
use rota_storage::{CreateUserParams, Role, Store, StoreError, User, UserId};

use crate::server::{extract_signature, RotaServer};

pub(crate) fn user_to_proto(user: &User) -> rota_proto::User {
    rota_proto::User {
        id: user.id.0.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        created_by: user
            .created_by
            .as_ref()
            .map(|c| c.0.to_string())
            .unwrap_or_default(),
        created_at: user.created_at.timestamp(),
    }
}

pub async fn create_user(
    server: &RotaServer,
    request: Request<CreateUserRequest>,
) -> Result<Response<rota_proto::User>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/CreateUser",
            &req_for_verify,
            &request_hash,
        )
        .await?;
    let req = request.into_inner();

    let role: Role = req
        .role
        .parse()
        .map_err(|_| Status::invalid_argument(format!("Invalid role: {}", req.role)))?;

    // Only admin provisions hr; hr (or admin) provisions employees; admin
    // accounts are bootstrapped from the CLI, never over this RPC.
    if !caller.role.can_provision(&role) {
        return Err(Status::permission_denied(format!(
            "{} accounts cannot create {} users",
            caller.role.as_str(),
            role.as_str()
        )));
    }

    let name = req.name.trim();
    if name.is_empty() {
        return Err(Status::invalid_argument("Name must not be empty"));
    }
    let email = req.email.trim();
    if email.is_empty() {
        return Err(Status::invalid_argument("Email must not be empty"));
    }

    let key_bytes: [u8; 32] = req
        .public_key
        .as_slice()
        .try_into()
        .map_err(|_| Status::invalid_argument("Public key must be exactly 32 bytes"))?;
    ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| Status::invalid_argument("Invalid Ed25519 public key"))?;

    let user_id = server
        .store
        .create_user(&CreateUserParams {
            name: name.to_string(),
            email: email.to_string(),
            role,
            created_by: Some(caller.id.clone()),
            public_key: req.public_key,
        })
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => {
                Status::already_exists("A user with this email already exists")
            }
            e => RotaServer::store_failure("failed to create user", e),
        })?;

    server
        .audit(
            AuditEvent::new(AuditAction::UserCreate, caller.id.clone())
                .subject(user_id.clone())
                .detail(role.as_str()),
        )
        .await;

    let user = server
        .store
        .get_user_by_id(&user_id)
        .await
        .map_err(|e| RotaServer::store_failure("failed to get user", e))?;

    Ok(Response::new(user_to_proto(&user)))
}

pub async fn get_user(
    server: &RotaServer,
    request: Request<GetUserRequest>,
) -> Result<Response<rota_proto::User>, Status> {
    let (caller_id, timestamp, signature, request_hash) = extract_signature(&request)?;
    let req_for_verify = request.get_ref().clone();
    let caller = server
        .verify_signature_and_get_user(
            &caller_id,
            timestamp,
            &signature,
            "/rota.RotaService/GetUser",
            &req_for_verify,
            &request_hash,
        )
        .await?;
    let req = request.into_inner();

    let target_id = Uuid::parse_str(&req.user_id)
        .map(UserId)
        .map_err(|_| Status::invalid_argument("Invalid user ID"))?;

    let scope = server.resolve_scope(&caller).await?;
    if target_id != caller.id && !scope.contains(&target_id) {
        return Err(RotaServer::subject_rejection());
    }

    let user = server
        .store
        .get_user_by_id(&target_id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => RotaServer::subject_rejection(),
            e => RotaServer::store_failure("failed to get user", e),
        })?;

    Ok(Response::new(user_to_proto(&user)))
}

pub async fn list_users(
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
            "/rota.RotaService/ListUsers",
            &req_for_verify,
            &request_hash,
        )
        .await?;

    let users = match caller.role {
        Role::Admin => server
            .store
            .list_users()
            .await
            .map_err(|e| RotaServer::store_failure("failed to list users", e))?,
        Role::Hr => {
            let mut users = server
                .store
                .list_users_created_by(&caller.id)
                .await
                .map_err(|e| RotaServer::store_failure("failed to list users", e))?;
            users.insert(0, caller.clone());
            users
        }
        Role::Employee => vec![caller.clone()],
    };

    Ok(Response::new(UserList {
        users: users.iter().map(user_to_proto).collect(),
    }))
}
