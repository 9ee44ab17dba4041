use crate::{AppState, handlers};
use axum::{Router, routing::{get, post}};

/// Public Router Module
///
/// Endpoints reachable without a bearer token: the identity gateway
/// (register/login) and the health probe. Everything else in the API sits
/// behind the authentication layer.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates an account (role 'user') and issues the first bearer token.
        .route("/register", post(handlers::register))
        // POST /login
        // Verifies credentials and issues a fresh bearer token.
        .route("/login", post(handlers::login))
        // POST /logout
        // Revokes the presented bearer token. Lives outside the auth layer so
        // revoking an already-revoked token stays an idempotent success; the
        // handler still rejects requests with no token at all.
        .route("/logout", post(handlers::logout))
}
