use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Application-level error taxonomy. Every failure is translated into one of
/// these kinds before it reaches the HTTP boundary; raw storage or gateway
/// errors are never surfaced verbatim to callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidOrExpiredToken(String),

    #[error("invalid or expired reset code")]
    InvalidOrExpiredCode,

    #[error("new password must be different from the current password")]
    SamePassword,

    #[error("too many requests, please try again later")]
    RateLimited,

    #[error("service temporarily unavailable")]
    UpstreamUnavailable,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Conflict(_) => "Conflict",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidOrExpiredToken(_) => "InvalidOrExpiredToken",
            AppError::InvalidOrExpiredCode => "InvalidOrExpiredCode",
            AppError::SamePassword => "SamePassword",
            AppError::RateLimited => "RateLimited",
            AppError::UpstreamUnavailable => "UpstreamUnavailable",
            AppError::Database(_) => "DatabaseError",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, self.kind(), m.clone()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, self.kind(), m.clone()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, self.kind(), m.clone()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, self.kind(), m.clone()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, self.kind(), m.clone()),
            AppError::InvalidOrExpiredToken(m) => (StatusCode::BAD_REQUEST, self.kind(), m.clone()),
            AppError::InvalidOrExpiredCode | AppError::SamePassword => {
                (StatusCode::BAD_REQUEST, self.kind(), self.to_string())
            }
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.kind(), self.to_string()),
            AppError::UpstreamUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, self.kind(), self.to_string())
            }
            AppError::Database(e) => {
                // Unique-constraint violations are a client-correctable conflict.
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        (
                            StatusCode::CONFLICT,
                            "DuplicateKeyError",
                            "a resource with these values already exists".to_string(),
                        )
                    } else {
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            self.kind(),
                            "database error".to_string(),
                        )
                    }
                } else {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        self.kind(),
                        "database error".to_string(),
                    )
                }
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                self.kind(),
                "an internal error occurred".to_string(),
            ),
        };

        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": {
                "type": kind,
                "message": message,
            },
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let res = AppError::Conflict("email already registered".into()).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_are_sanitized() {
        let res = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_and_expired_codes_share_one_kind() {
        // Wrong code and expired code must be indistinguishable to the caller.
        let a = AppError::InvalidOrExpiredCode;
        let b = AppError::InvalidOrExpiredCode;
        assert_eq!(a.kind(), b.kind());
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let res = AppError::Unauthorized("invalid email or password".into()).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        let res = AppError::RateLimited.into_response();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
