//! Error taxonomy for the authentication service
//!
//! Every failure leaves the service as `{"error": "<message>"}`; storage
//! failures keep their detail in the server log only.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::authorizer::RejectReason;

/// Custom error type for the authentication service
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Duplicate username or email
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials; deliberately undifferentiated so a failed login
    /// does not reveal whether the username exists
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Rejected by the request authorizer
    #[error("{}", .0.message())]
    Unauthenticated(RejectReason),

    /// Logout on an untracked token, or a vanished user
    #[error("{0}")]
    NotFound(String),

    /// Underlying storage failure, surfaced generically
    #[error("internal server error")]
    Store(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Check whether a repository error was a storage-level unique-constraint
/// violation, the source of truth for duplicate registrations racing past
/// the existence pre-check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            AuthError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Unauthenticated(RejectReason::SessionExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::Store(anyhow::anyhow!("db gone")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn store_errors_do_not_leak_detail() {
        let err = AuthError::Store(anyhow::anyhow!("connection refused at 10.0.0.5"));
        assert_eq!(err.to_string(), "internal server error");
    }

    #[test]
    fn unauthenticated_uses_the_reason_message() {
        let err = AuthError::Unauthenticated(RejectReason::SessionInvalidated);
        assert_eq!(err.to_string(), "session invalidated");
    }
}
