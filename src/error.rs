//! Request-level errors.
//!
//! Every handler returns `Result<_, AppError>`; the error becomes a JSON body
//! `{"success": false, "message": ...}` with the matching status code. Storage
//! failures are logged with their detail and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::auth::{password::PasswordError, DenylistError, TokenError};
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// No credentials, or credentials that do not match.
    #[error("{0}")]
    Unauthorized(String),

    /// Bad, expired or revoked token, wrong role, or someone else's resource.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate email, or seats already held by another booking.
    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),

    /// Token signing, hashing workers and other non-storage failures.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Storage(detail) => {
                tracing::error!("storage failure: {}", detail);
                "Internal server error".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => AppError::Conflict("User already exists".to_string()),
            StoreError::SeatsTaken(seats) => AppError::Conflict(format!(
                "Seats already booked: {}",
                seats.iter().map(i32::to_string).collect::<Vec<_>>().join(", ")
            )),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<DenylistError> for AppError {
    fn from(err: DenylistError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Forbidden("Token expired".to_string()),
            TokenError::Invalid(_) => AppError::Forbidden("Invalid token".to_string()),
            TokenError::Signing(e) => AppError::Internal(format!("failed to sign token: {e}")),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect();
        messages.sort();
        messages.dedup();
        AppError::Validation(messages.join("; "))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn storage_errors_hide_detail() {
        let response = AppError::Storage("connection refused on 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn taken_seats_become_conflict() {
        let err: AppError = StoreError::SeatsTaken(vec![3, 4]).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Seats already booked: 3, 4");
    }
}
