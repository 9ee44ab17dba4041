use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::policy::Role;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Canonical account record stored in the `users` table.
/// The password hash never leaves the server: it is skipped during serialization
/// so no response can leak it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    // Unique login identifier, enforced at the persistence layer.
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    // The RBAC field: 'user' or 'admin'. Stored as text, parsed by the policy layer.
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The actor's role as the policy enum. Unknown strings degrade to `Role::User`
    /// so a corrupted row can never grant admin access.
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::User)
    }
}

/// Todo
///
/// A todo item from the `todos` table. Every todo is owned by exactly one user
/// (`user_id`); ownership is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Todo {
    pub id: i64,
    // FK to users.id (owner).
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Join Views (Output) ---

/// UserSummary
///
/// The owner fields embedded into admin todo listings. A trimmed view of `User`
/// so the join never has to carry the password hash around.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// TodoWithOwner
///
/// A todo enriched with its owning user, produced by an explicit JOIN in the
/// repository. Used by the admin-wide listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TodoWithOwner {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// UserWithTodos
///
/// A user together with all their todos, assembled by a batched fetch
/// (one users query, one todos query, grouped in memory). Admin-only view.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserWithTodos {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub todos: Vec<Todo>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /register.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Field validation, checked before any persistence write.
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        validate_name(&self.name, true, &mut errors);
        validate_email(&self.email, true, &mut errors);
        validate_password(&self.password, true, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_map(errors))
        }
    }
}

/// LoginRequest
///
/// Input payload for POST /login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// CreateTodoRequest
///
/// Input payload for POST /todos. There is deliberately no `user_id` field:
/// the owner is always the authenticated actor, and any `user_id` supplied in
/// the request body is ignored by deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
}

impl CreateTodoRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        validate_title(&self.title, &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_map(errors))
        }
    }
}

/// UpdateTodoRequest
///
/// Partial update payload for PUT/PATCH /todos/{id}. Only supplied fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateTodoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTodoRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(title) = &self.title {
            validate_title(title, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_map(errors))
        }
    }
}

/// UpdateUserRequest
///
/// Partial profile update payload for PUT /users/{id} (self-service only).
/// A supplied password is re-hashed before storage; it never reaches the
/// repository in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Some(name) = &self.name {
            validate_name(name, false, &mut errors);
        }
        if let Some(email) = &self.email {
            validate_email(email, false, &mut errors);
        }
        if let Some(password) = &self.password {
            validate_password(password, false, &mut errors);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_map(errors))
        }
    }
}

/// AssignRoleRequest
///
/// Input payload for PATCH /admin/users/{id}/role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AssignRoleRequest {
    pub role: String,
}

impl AssignRoleRequest {
    /// Accepts exactly 'user' or 'admin'.
    pub fn validate(&self) -> ApiResult<Role> {
        Role::parse(&self.role)
            .ok_or_else(|| ApiError::validation("role", "The selected role is invalid."))
    }
}

// --- Shared field validators (Laravel-equivalent rules) ---

fn validate_name(name: &str, required: bool, errors: &mut BTreeMap<String, Vec<String>>) {
    if name.trim().is_empty() {
        if required {
            push_error(errors, "name", "The name field is required.");
        } else {
            push_error(errors, "name", "The name must not be empty.");
        }
    } else if name.chars().count() > 255 {
        push_error(errors, "name", "The name may not be greater than 255 characters.");
    }
}

fn validate_email(email: &str, required: bool, errors: &mut BTreeMap<String, Vec<String>>) {
    if email.trim().is_empty() {
        if required {
            push_error(errors, "email", "The email field is required.");
            return;
        }
    }
    // Minimal well-formedness check; real uniqueness lives at the persistence layer.
    let valid = email.chars().count() <= 255
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.starts_with('.')
        });
    if !valid {
        push_error(errors, "email", "The email must be a valid email address.");
    }
}

fn validate_password(password: &str, required: bool, errors: &mut BTreeMap<String, Vec<String>>) {
    if password.is_empty() && required {
        push_error(errors, "password", "The password field is required.");
    } else if password.chars().count() < 8 {
        push_error(errors, "password", "The password must be at least 8 characters.");
    }
}

fn validate_title(title: &str, errors: &mut BTreeMap<String, Vec<String>>) {
    if title.trim().is_empty() {
        push_error(errors, "title", "The title field is required.");
    } else if title.chars().count() > 255 {
        push_error(errors, "title", "The title may not be greater than 255 characters.");
    }
}

fn push_error(errors: &mut BTreeMap<String, Vec<String>>, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

// --- Response Envelopes (Output) ---

/// AuthResponse
///
/// Returned by /register and /login: the account plus a freshly issued bearer token.
/// The plaintext token appears here exactly once; only its digest is stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

/// UserEnvelope
///
/// `{message, user}` wrapper used by the profile and admin user endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserEnvelope {
    pub message: String,
    pub user: User,
}

/// UserWithTodosEnvelope
///
/// `{message, user}` wrapper where the user carries their todos (admin detail view).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserWithTodosEnvelope {
    pub message: String,
    pub user: UserWithTodos,
}

/// TodoEnvelope
///
/// `{message, data}` wrapper used by single-todo responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TodoEnvelope {
    pub message: String,
    pub data: Todo,
}

/// MessageResponse
///
/// Bare `{message}` body for mutations that return no data (delete, logout).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}
