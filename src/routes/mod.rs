//! Router Module Index
//!
//! Organizes the application's routing into access-segregated modules, so
//! access control is applied explicitly at the module level (via Axum layers)
//! rather than per-route.

/// Routes accessible without a token (registration, login, health).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a validated bearer token.
pub mod authenticated;

/// Routes restricted to users with the 'admin' role. Authentication happens at
/// the layer above; the admin role check runs inside each handler.
pub mod admin;
