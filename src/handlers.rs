use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiError, ApiResult},
    models::{
        AssignRoleRequest, AuthResponse, CreateTodoRequest, LoginRequest, MessageResponse,
        RegisterRequest, Todo, TodoEnvelope, TodoWithOwner, UpdateTodoRequest, UpdateUserRequest,
        User, UserEnvelope, UserWithTodos, UserWithTodosEnvelope,
    },
    policy,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use serde_json::{Value, json};

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates a new account with role 'user' and issues the first
/// bearer token. Validation (including email uniqueness) runs before any write.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;

    if state.repo.email_taken(&payload.email, None).await? {
        return Err(ApiError::validation(
            "email",
            "The email has already been taken.",
        ));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(&payload.name, &payload.email, &password_hash)
        .await?;

    let token = issue_token(&state, user.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user,
            token,
        }),
    ))
}

/// login
///
/// [Public Route] Verifies credentials and issues a fresh bearer token.
/// Unknown emails and wrong passwords are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !auth::verify_password(&payload.password, &user.password_hash)? {
        return Err(invalid_credentials());
    }

    let token = issue_token(&state, user.id).await?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user,
        token,
    }))
}

/// logout
///
/// [Token Route] Revokes the presented bearer token. The token is extracted
/// here rather than through the auth middleware so revocation stays idempotent:
/// presenting an already-revoked token is a no-op success, not a 401. Only a
/// missing or malformed Authorization header is rejected.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "No token presented")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<MessageResponse>> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthenticated)?;

    state.repo.revoke_token(&auth::hash_token(token)).await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// get_me
///
/// [Authenticated Route] Returns the authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserEnvelope))
)]
pub async fn get_me(auth: AuthUser) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        message: "User profile retrieved successfully".to_string(),
        user: auth.user,
    })
}

// --- Todo Handlers ---

/// list_todos
///
/// [Authenticated Route] Lists todos scoped by role: admins see every todo with
/// its owner embedded, everyone else sees exactly their own. Creation order.
#[utoipa::path(
    get,
    path = "/todos",
    responses((status = 200, description = "Todos retrieved"))
)]
pub async fn list_todos(auth: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = if auth.user.role() == policy::Role::Admin {
        json!(state.repo.list_todos_with_owner().await?)
    } else {
        json!(state.repo.list_todos_for_user(auth.user.id).await?)
    };

    Ok(Json(json!({
        "message": "Todos retrieved successfully",
        "data": data,
    })))
}

/// create_todo
///
/// [Authenticated Route] Creates a todo owned by the actor. The owner comes
/// from the authenticated identity; any user id in the request body is ignored.
#[utoipa::path(
    post,
    path = "/todos",
    request_body = CreateTodoRequest,
    responses(
        (status = 201, description = "Created", body = TodoEnvelope),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn create_todo(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateTodoRequest>,
) -> ApiResult<(StatusCode, Json<TodoEnvelope>)> {
    payload.validate()?;

    let todo = state
        .repo
        .create_todo(auth.user.id, &payload.title, payload.description.as_deref())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(TodoEnvelope {
            message: "Todo created successfully".to_string(),
            data: todo,
        }),
    ))
}

/// get_todo
///
/// [Authenticated Route] Fetches a single todo. Existence is checked before
/// authorization: an absent id is 404, a todo the actor may not see is 403.
#[utoipa::path(
    get,
    path = "/todos/{id}",
    params(("id" = i64, Path, description = "Todo ID")),
    responses(
        (status = 200, description = "Found", body = TodoEnvelope),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_todo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TodoEnvelope>> {
    let todo = load_authorized_todo(&state, &auth, id).await?;
    Ok(Json(TodoEnvelope {
        message: "Todo retrieved successfully".to_string(),
        data: todo,
    }))
}

/// update_todo
///
/// [Authenticated Route] Partial update of a todo the actor owns (or any todo
/// for admins). Only supplied fields change; ownership never does.
#[utoipa::path(
    put,
    path = "/todos/{id}",
    params(("id" = i64, Path, description = "Todo ID")),
    request_body = UpdateTodoRequest,
    responses(
        (status = 200, description = "Updated", body = TodoEnvelope),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_todo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTodoRequest>,
) -> ApiResult<Json<TodoEnvelope>> {
    load_authorized_todo(&state, &auth, id).await?;
    payload.validate()?;

    let todo = state
        .repo
        .update_todo(id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("Todo"))?;

    Ok(Json(TodoEnvelope {
        message: "Todo updated successfully".to_string(),
        data: todo,
    }))
}

/// delete_todo
///
/// [Authenticated Route] Hard-deletes a todo the actor owns (or any, for admins).
#[utoipa::path(
    delete,
    path = "/todos/{id}",
    params(("id" = i64, Path, description = "Todo ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_todo(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    load_authorized_todo(&state, &auth, id).await?;
    state.repo.delete_todo(id).await?;

    Ok(Json(MessageResponse {
        message: "Todo deleted successfully".to_string(),
    }))
}

// --- User Self-Service Handlers ---

/// update_user
///
/// [Authenticated Route] Updates the actor's own profile. Strictly self-only:
/// admins editing other users' profiles through this route get 403 like
/// anyone else. Email uniqueness excludes the actor's own row.
#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserEnvelope),
        (status = 403, description = "Not your profile"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserEnvelope>> {
    state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !policy::can_manage_profile(&auth.user, id) {
        return Err(ApiError::Forbidden(
            "Unauthorized - You can only update your own profile".to_string(),
        ));
    }

    payload.validate()?;

    if let Some(email) = &payload.email {
        if state.repo.email_taken(email, Some(id)).await? {
            return Err(ApiError::validation(
                "email",
                "The email has already been taken.",
            ));
        }
    }

    let password_hash = match &payload.password {
        Some(password) => Some(auth::hash_password(password)?),
        None => None,
    };

    let user = state
        .repo
        .update_user(
            id,
            payload.name.as_deref(),
            payload.email.as_deref(),
            password_hash.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(UserEnvelope {
        message: "User updated successfully".to_string(),
        user,
    }))
}

/// delete_user
///
/// [Authenticated Route] Deletes the actor's own account. Self-only, and the
/// delete cascades to the account's todos and tokens.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not your account"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !policy::can_manage_profile(&auth.user, id) {
        return Err(ApiError::Forbidden(
            "Unauthorized - You can only delete your own account".to_string(),
        ));
    }

    state.repo.delete_user(id).await?;

    Ok(Json(MessageResponse {
        message: "User account deleted successfully".to_string(),
    }))
}

// --- Admin Handlers ---

/// admin_list_users
///
/// [Admin Route] Every user in the system with their todos attached
/// (batched fetch, not per-row queries).
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All users", body = [UserWithTodos]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn admin_list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UserWithTodos>>> {
    policy::require_admin(&auth.user)?;
    Ok(Json(state.repo.list_users_with_todos().await?))
}

/// admin_list_todos
///
/// [Admin Route] Every todo in the system with its owner joined in.
#[utoipa::path(
    get,
    path = "/admin/todos",
    responses(
        (status = 200, description = "All todos", body = [TodoWithOwner]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn admin_list_todos(
    auth: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TodoWithOwner>>> {
    policy::require_admin(&auth.user)?;
    Ok(Json(state.repo.list_todos_with_owner().await?))
}

/// admin_get_user
///
/// [Admin Route] A single user with their todos attached.
#[utoipa::path(
    get,
    path = "/admin/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserWithTodosEnvelope),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn admin_get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserWithTodosEnvelope>> {
    policy::require_admin(&auth.user)?;

    let user = state
        .repo
        .get_user_with_todos(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(UserWithTodosEnvelope {
        message: "User retrieved successfully".to_string(),
        user,
    }))
}

/// admin_assign_role
///
/// [Admin Route] Sets a user's role to 'user' or 'admin'. Idempotent:
/// re-assigning the current role succeeds and changes nothing.
#[utoipa::path(
    patch,
    path = "/admin/users/{id}/role",
    params(("id" = i64, Path, description = "User ID")),
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = UserEnvelope),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Invalid role")
    )
)]
pub async fn admin_assign_role(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<Json<UserEnvelope>> {
    policy::require_admin(&auth.user)?;
    let role = payload.validate()?;

    let user = state
        .repo
        .set_user_role(id, role.as_str())
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(UserEnvelope {
        message: "Role assigned successfully".to_string(),
        user,
    }))
}

// --- Shared helpers ---

/// Existence first (404), authorization second (403). Used by every
/// single-todo handler so the ordering can never drift between them.
async fn load_authorized_todo(state: &AppState, auth: &AuthUser, id: i64) -> ApiResult<Todo> {
    let todo = state
        .repo
        .get_todo(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Todo"))?;

    if !policy::can_access_todo(&auth.user, &todo) {
        return Err(ApiError::forbidden());
    }

    Ok(todo)
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthenticated("Invalid credentials".to_string())
}

async fn issue_token(state: &AppState, user_id: i64) -> ApiResult<String> {
    let token = auth::generate_token();
    state
        .repo
        .insert_token(user_id, &auth::hash_token(&token))
        .await?;
    Ok(token)
}
