//! Role types for the admin → hr → employee hierarchy.

use std::str::FromStr;

/// User role. The hierarchy is a shallow two-level tree: admins provision hr
/// accounts, hr (or admin) accounts provision employees, employees provision
/// nobody.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Hr,
    Employee,
}

/// Error type for parsing Role from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl std::fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "hr" => Ok(Role::Hr),
            "employee" => Ok(Role::Employee),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hr => "hr",
            Role::Employee => "employee",
        }
    }

    /// Check if this role may provision a user with the target role.
    /// Admin accounts are never provisioned over the API (CLI bootstrap only).
    pub fn can_provision(&self, target: &Role) -> bool {
        match self {
            Role::Admin => matches!(target, Role::Hr | Role::Employee),
            Role::Hr => matches!(target, Role::Employee),
            Role::Employee => false,
        }
    }

    /// Check if this role may mark attendance and run team-level reads.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}
