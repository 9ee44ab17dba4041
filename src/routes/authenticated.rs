use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for any user holding a valid bearer token. Every handler receives the
/// resolved `AuthUser`, which the authorization policy evaluates per request:
/// todo handlers enforce owner-or-admin, profile handlers enforce self-only.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // The authenticated user's own profile.
        .route("/me", get(handlers::get_me))
        // --- Todos ---
        // GET /todos lists role-scoped todos; POST /todos creates one owned by the actor.
        .route("/todos", get(handlers::list_todos).post(handlers::create_todo))
        // GET/PUT/PATCH/DELETE /todos/{id}
        // Single-todo operations. Existence is checked before authorization
        // (404 before 403); PUT and PATCH share the partial-update handler.
        .route(
            "/todos/{id}",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .patch(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        // --- Profile self-service ---
        // PUT/DELETE /users/{id}
        // Updates or deletes the actor's own account. Self-only, admins
        // included; deletion cascades to owned todos and tokens.
        .route(
            "/users/{id}",
            put(handlers::update_user).delete(handlers::delete_user),
        )
}
