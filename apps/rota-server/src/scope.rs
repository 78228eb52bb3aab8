//! Caller scope resolution: which subjects a caller may see or act upon.

use tonic::Status;

use rota_storage::{Role, Store, User, UserId};

use crate::server::RotaServer;

/// The set of subject users a caller is authorized to read or write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Admin: every subject.
    Unrestricted,
    /// Hr: exactly the users this caller provisioned. May be empty.
    Members(Vec<UserId>),
    /// Employee: the caller alone.
    SelfOnly(UserId),
}

impl Scope {
    pub fn contains(&self, user_id: &UserId) -> bool {
        match self {
            Scope::Unrestricted => true,
            Scope::Members(members) => members.contains(user_id),
            Scope::SelfOnly(own) => own == user_id,
        }
    }

    /// True when no read over this scope can match anything. Reads must
    /// short-circuit to an empty result without querying record storage.
    pub fn is_empty(&self) -> bool {
        matches!(self, Scope::Members(members) if members.is_empty())
    }

    /// Subject filter for store queries: `None` means unrestricted.
    pub fn subject_filter(&self) -> Option<Vec<UserId>> {
        match self {
            Scope::Unrestricted => None,
            Scope::Members(members) => Some(members.clone()),
            Scope::SelfOnly(own) => Some(vec![own.clone()]),
        }
    }
}

impl RotaServer {
    /// Resolve the caller's scope from their role, in one exhaustive match.
    ///
    /// Every caller has a valid scope, even if it is empty; the only failure
    /// mode is a storage error while looking up an hr caller's users.
    pub async fn resolve_scope(&self, caller: &User) -> Result<Scope, Status> {
        match caller.role {
            Role::Admin => Ok(Scope::Unrestricted),
            Role::Hr => {
                let members = self
                    .store
                    .list_users_created_by(&caller.id)
                    .await
                    .map_err(|e| Self::store_failure("failed to resolve hr scope", e))?
                    .into_iter()
                    .map(|u| u.id)
                    .collect();
                Ok(Scope::Members(members))
            }
            Role::Employee => Ok(Scope::SelfOnly(caller.id.clone())),
        }
    }
}
