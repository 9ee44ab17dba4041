use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::models::{Todo, User};

/// Role
///
/// The two access levels of the system. Stored as text in the users table and
/// parsed here so every authorization decision runs against the enum, never
/// against raw strings scattered through handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Parses a stored role string. Anything outside {user, admin} is rejected.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// can_access_todo
///
/// Whether `actor` may view, update or delete `todo`.
/// Admins may act on any todo; everyone else only on todos they own.
pub fn can_access_todo(actor: &User, todo: &Todo) -> bool {
    actor.role() == Role::Admin || todo.user_id == actor.id
}

/// can_manage_profile
///
/// Whether `actor` may update or delete the account identified by
/// `target_user_id` via the self-service routes. Strictly self-only:
/// admins get no exception here, they manage other accounts exclusively
/// through the role-assignment route.
pub fn can_manage_profile(actor: &User, target_user_id: i64) -> bool {
    actor.id == target_user_id
}

/// require_admin
///
/// Gate for the /admin routes. Evaluated inside every admin handler after
/// authentication has resolved the actor.
pub fn require_admin(actor: &User) -> ApiResult<()> {
    if actor.role() == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}
