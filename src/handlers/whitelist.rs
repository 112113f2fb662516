//! Whitelist request HTTP handlers.
//!
//! This module implements the whitelist API endpoints:
//! - POST /api/v1/whitelist-requests - Public submission (rate-limited)
//! - GET /api/v1/whitelist-requests - Admin listing
//! - PUT /api/v1/whitelist-requests/:id - Admin review (approve/reject)
//! - DELETE /api/v1/whitelist-requests/:id - Admin hard delete

use crate::{
    error::AppError,
    middleware::auth::AdminContext,
    models::{
        response::ApiResponse,
        whitelist::{
            ListRequestsData, ListRequestsQuery, PublicWhitelistRequest, ReviewAction,
            ReviewWhitelistRequest, SubmitWhitelistRequest, WhitelistRequest,
        },
    },
    services::whitelist_service::{self, InvitationDispatch, SubmitOutcome},
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Submit a whitelist request (public).
///
/// # Endpoint
///
/// `POST /api/v1/whitelist-requests`
///
/// # Request Body
///
/// ```json
/// {
///   "email": "someone@example.com",
///   "reason": "I'd like to try the beta"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: first request for this email
/// - **200 OK**: a previously rejected request was resubmitted
/// - **409 Conflict**: the email is already pending or already approved
/// - **400 Bad Request**: malformed email or over-long reason
/// - **429 Too Many Requests**: submission rate limit hit
///
/// ```json
/// {
///   "success": true,
///   "message": "Request submitted for review",
///   "data": {
///     "id": "550e8400-e29b-41d4-a716-446655440000",
///     "email": "someone@example.com",
///     "status": "pending",
///     "reason": "I'd like to try the beta",
///     "requested_at": "2026-01-05T10:00:00Z"
///   }
/// }
/// ```
///
/// # Privacy
///
/// Responses never reveal whether an email belongs to an existing
/// account, and the public view strips all review fields.
pub async fn submit_request(
    State(state): State<AppState>,
    Json(request): Json<SubmitWhitelistRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome =
        whitelist_service::submit_request(&state.pool, &request.email, request.reason).await?;

    let (status, message) = match outcome {
        SubmitOutcome::Created(_) => (StatusCode::CREATED, "Request submitted for review"),
        SubmitOutcome::Resubmitted(_) => (StatusCode::OK, "Request resubmitted for review"),
    };

    let entry = match outcome {
        SubmitOutcome::Created(entry) | SubmitOutcome::Resubmitted(entry) => entry,
    };

    Ok((
        status,
        Json(ApiResponse::ok(message, PublicWhitelistRequest::from(entry))),
    ))
}

/// List whitelist requests (admin).
///
/// # Endpoint
///
/// `GET /api/v1/whitelist-requests?status=pending&page=1&limit=20`
///
/// # Authentication
///
/// Requires a valid admin key in the Authorization header.
///
/// # Query Parameters
///
/// - `status` (optional): `pending`, `approved`, or `rejected`; unset means all
/// - `page` (optional): 1-based page number, defaults to 1
/// - `limit` (optional): page size, defaults to 20, capped at 100
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "requests": [
///       {
///         "id": "550e8400-e29b-41d4-a716-446655440000",
///         "email": "someone@example.com",
///         "status": "approved",
///         "reason": null,
///         "requested_at": "2026-01-05T10:00:00Z",
///         "reviewed_at": "2026-01-05T12:00:00Z",
///         "reviewed_by": "660e8400-e29b-41d4-a716-446655440001",
///         "reviewed_by_name": "alice",
///         "notes": "verified"
///       }
///     ],
///     "total": 1,
///     "page": 1,
///     "limit": 20
///   }
/// }
/// ```
///
/// # Ordering
///
/// Requests are returned in reverse chronological order (newest first).
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<ApiResponse<ListRequestsData>>, AppError> {
    let data =
        whitelist_service::list_requests(&state.pool, query.status, query.page, query.limit)
            .await?;

    Ok(Json(ApiResponse::data(data)))
}

/// Review a pending whitelist request (admin).
///
/// # Endpoint
///
/// `PUT /api/v1/whitelist-requests/{id}`
///
/// # Request Body
///
/// ```json
/// {
///   "action": "approve",
///   "notes": "verified with the requester",
///   "send_invitation": true
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: review persisted; the message notes whether the
///   invitation email went out
/// - **404 Not Found**: unknown request id
/// - **409 Conflict**: the request was already reviewed
/// - **400 Bad Request**: over-long notes
///
/// # Invitation Dispatch
///
/// The review is authoritative once persisted. A failure issuing the
/// token or sending the email is logged and reported only in the
/// response message, never as an error status.
pub async fn review_request(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminContext>,
    Path(request_id): Path<Uuid>,
    Json(request): Json<ReviewWhitelistRequest>,
) -> Result<Json<ApiResponse<WhitelistRequest>>, AppError> {
    let outcome = whitelist_service::review_request(
        &state.pool,
        &state.config,
        request_id,
        request.action,
        admin.admin_id,
        request.notes,
        request.send_invitation,
    )
    .await?;

    let message = match (request.action, outcome.invitation) {
        (ReviewAction::Reject, _) => "Request rejected",
        (ReviewAction::Approve, InvitationDispatch::Sent) => {
            "Request approved and invitation email sent"
        }
        (ReviewAction::Approve, InvitationDispatch::NotRequested) => "Request approved",
        (ReviewAction::Approve, InvitationDispatch::Failed) => {
            "Request approved, but the invitation email could not be sent"
        }
    };

    Ok(Json(ApiResponse::ok(message, outcome.request)))
}

/// Delete a whitelist request (admin).
///
/// # Endpoint
///
/// `DELETE /api/v1/whitelist-requests/{id}`
///
/// # Response
///
/// - **200 OK**: the entry was removed (any status; this is a hard delete)
/// - **404 Not Found**: unknown request id
///
/// Deleting an approved entry revokes the approval: a later gate check
/// for that email behaves as if it was never whitelisted.
pub async fn delete_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    whitelist_service::delete_request(&state.pool, request_id).await?;

    Ok(Json(ApiResponse::message("Request deleted")))
}
