use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The single failure taxonomy shared by the repository, guard, and handler layers.
/// Every variant maps to exactly one HTTP status code, and every error leaving the
/// service is serialized into the same JSON envelope:
///
/// ```json
/// { "success": false, "message": "..." }
/// ```
///
/// Infrastructure failures (database, hashing) are folded into `Internal`; their
/// underlying cause is logged server-side and never exposed to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input (400).
    #[error("{0}")]
    Validation(String),

    /// A path identifier that is not a well-formed UUID (400).
    #[error("{0}")]
    InvalidId(String),

    /// Missing, expired, revoked, or otherwise invalid credentials/token (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but lacking the required role (403).
    #[error("{0}")]
    Forbidden(String),

    /// The requested resource does not exist or is not visible (404).
    #[error("{0}")]
    NotFound(String),

    /// A uniqueness or referential-integrity violation (409).
    #[error("{0}")]
    Conflict(String),

    /// Unexpected runtime failure (500). The detail is logged, not returned.
    #[error("Internal server error")]
    Internal(String),

    /// Unexpected store failure (500). The query error is logged, not returned.
    #[error("Internal server error")]
    Database(#[from] sqlx::Error),

    /// Unexpected hashing failure (500).
    #[error("Internal server error")]
    Hashing(#[from] bcrypt::BcryptError),
}

impl ApiError {
    /// Maps each taxonomy variant to its HTTP status code (see the error table in the
    /// API contract).
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) | ApiError::Database(_) | ApiError::Hashing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    /// Converts the typed failure into the uniform JSON envelope. This is the single
    /// error-handling stage of the HTTP surface: handlers and guards only ever return
    /// `ApiError`, and this impl decides what the client sees.
    fn into_response(self) -> Response {
        // Log the underlying cause server-side only. Clients get the safe message.
        match &self {
            ApiError::Internal(detail) => tracing::error!("internal error: {}", detail),
            ApiError::Database(e) => tracing::error!("database error: {:?}", e),
            ApiError::Hashing(e) => tracing::error!("bcrypt error: {:?}", e),
            _ => {}
        }

        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}
