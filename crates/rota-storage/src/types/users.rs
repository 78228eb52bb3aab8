//! User types.

use chrono::{DateTime, Utc};

use super::{Role, UserId};

/// User record
#[derive(Clone, Debug)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// The hr/admin account that provisioned this user; None for root accounts.
    pub created_by: Option<UserId>,
    pub public_key: Vec<u8>, // Ed25519 for request authentication
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a user
#[derive(Clone, Debug)]
pub struct CreateUserParams {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_by: Option<UserId>,
    pub public_key: Vec<u8>,
}
