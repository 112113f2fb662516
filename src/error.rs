//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Validation Errors**: malformed email, over-long free text, bad action
/// - **State-Conflict Errors**: duplicate submissions, re-reviewing an entry
/// - **Not-Found Errors**: unknown request ids
/// - **Authentication Errors**: invalid or missing admin keys
/// - **Invitation Errors**: unknown, mismatched, or expired tokens
/// - **Database Errors**: any sqlx::Error from storage operations
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Admin key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid admin key")]
    InvalidAdminKey,

    /// Whitelist request does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Whitelist request not found")]
    RequestNotFound,

    /// The email already has a pending request; nothing was changed.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("A request for this email is already pending review")]
    AlreadyPending,

    /// The email is already approved; nothing was changed.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("This email has already been approved")]
    AlreadyApproved,

    /// The request has already been approved or rejected and cannot be
    /// reviewed again.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("This request has already been reviewed")]
    AlreadyReviewed,

    /// Invitation token is unknown or does not match the email.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid invitation token")]
    InvitationInvalid,

    /// Invitation token exists but its validity window has passed.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("This invitation has expired")]
    InvitationExpired,

    /// Too many submissions from one client.
    ///
    /// Returns HTTP 429 Too Many Requests with a `Retry-After` header.
    #[error("Too many requests, try again later")]
    RateLimited { retry_after_secs: u64 },

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "success": false,
///   "code": "error_type",
///   "message": "Human-readable error message"
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `InvalidAdminKey` → 401 Unauthorized
/// - `RequestNotFound` → 404 Not Found
/// - `AlreadyPending` / `AlreadyApproved` / `AlreadyReviewed` → 409 Conflict
/// - `InvitationInvalid` / `InvitationExpired` / `InvalidRequest` → 400 Bad Request
/// - `RateLimited` → 429 Too Many Requests
/// - `Database` → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidAdminKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_admin_key",
                self.to_string(),
            ),
            AppError::RequestNotFound => {
                (StatusCode::NOT_FOUND, "request_not_found", self.to_string())
            }
            AppError::AlreadyPending => {
                (StatusCode::CONFLICT, "already_pending", self.to_string())
            }
            AppError::AlreadyApproved => {
                (StatusCode::CONFLICT, "already_approved", self.to_string())
            }
            AppError::AlreadyReviewed => {
                (StatusCode::CONFLICT, "already_reviewed", self.to_string())
            }
            AppError::InvitationInvalid => (
                StatusCode::BAD_REQUEST,
                "invitation_invalid",
                self.to_string(),
            ),
            AppError::InvitationExpired => (
                StatusCode::BAD_REQUEST,
                "invitation_expired",
                self.to_string(),
            ),
            AppError::RateLimited { retry_after_secs } => {
                let body = Json(json!({
                    "success": false,
                    "code": "rate_limited",
                    "message": self.to_string(),
                }));
                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                if let Ok(value) = retry_after_secs.to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::Database(ref e) => {
                // Log the real error; the client only sees a generic message
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "success": false,
            "code": code,
            "message": message
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            status_of(AppError::InvalidRequest("bad email".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::InvitationInvalid),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::InvitationExpired),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn state_conflicts_map_to_409() {
        assert_eq!(status_of(AppError::AlreadyPending), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::AlreadyApproved), StatusCode::CONFLICT);
        assert_eq!(status_of(AppError::AlreadyReviewed), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_and_auth_are_distinct() {
        assert_eq!(status_of(AppError::RequestNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::InvalidAdminKey),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn database_errors_hide_details() {
        let response = AppError::Database(sqlx::Error::PoolClosed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }
}
