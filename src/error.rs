use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shorthand result type for handlers and services.
pub type ApiResult<T> = Result<T, ApiError>;

/// ApiError
///
/// The unified error taxonomy of the API. Every handler returns `ApiResult<T>`,
/// and this type converts into the JSON error body the clients expect:
/// `{"message": "...", "errors": {"field": ["..."]}}` (the `errors` map is only
/// present for validation failures).
///
/// Mapping:
/// - `Validation`      -> 422 (malformed/missing/oversized fields, duplicate email)
/// - `Unauthenticated` -> 401 (missing/invalid/revoked token, bad credentials)
/// - `Forbidden`       -> 403 (authenticated but not permitted)
/// - `NotFound`        -> 404 (resource id absent)
/// - `Internal`        -> 500 (unexpected failures; details logged, not exposed)
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

/// ErrorBody
///
/// The serialized wire shape of an `ApiError`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    /// Single-field validation failure.
    pub fn validation(field: &str, message: &str) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::Validation {
            message: "The given data was invalid.".to_string(),
            errors,
        }
    }

    /// Validation failure carrying an already accumulated field -> messages map.
    pub fn validation_map(errors: BTreeMap<String, Vec<String>>) -> Self {
        Self::Validation {
            message: "The given data was invalid.".to_string(),
            errors,
        }
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthenticated("Unauthenticated.".to_string())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("Unauthorized".to_string())
    }

    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{} not found", resource))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { message, errors } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    message,
                    errors: Some(errors),
                },
            ),
            ApiError::Unauthenticated(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    message,
                    errors: None,
                },
            ),
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    message,
                    errors: None,
                },
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    message,
                    errors: None,
                },
            ),
            ApiError::Internal(message) => {
                // Log the real cause, return a generic body to the client.
                tracing::error!("internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        message: "Internal server error".to_string(),
                        errors: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Maps persistence errors into the API taxonomy.
///
/// A unique-constraint violation on the users email column surfaces as a 422
/// validation error (the same outcome the pre-insert uniqueness check yields),
/// so concurrent registrations race safely. Everything else unexpected is a 500.
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::not_found("Resource"),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::validation("email", "The email has already been taken.");
                    }
                }
                ApiError::Internal(format!("database error: {}", db_err))
            }
            other => ApiError::Internal(format!("database error: {}", other)),
        }
    }
}
