use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Admin Router Module
///
/// Routes exclusively for users with the 'admin' role, nested under `/admin`.
/// The surrounding layer authenticates; each handler calls `require_admin`
/// before touching data, so a non-admin always receives 403 regardless of the
/// target resource.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        // All users with their todos attached.
        .route("/users", get(handlers::admin_list_users))
        // GET /admin/todos
        // All todos in the system, each with its owner embedded.
        .route("/todos", get(handlers::admin_list_todos))
        // GET /admin/users/{id}
        // A single user with todos attached.
        .route("/users/{id}", get(handlers::admin_get_user))
        // PATCH /admin/users/{id}/role
        // Assigns 'user' or 'admin'. The only way an admin modifies another
        // account; profile edits stay self-service.
        .route("/users/{id}/role", patch(handlers::admin_assign_role))
}
