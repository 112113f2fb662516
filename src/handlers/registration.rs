//! Registration-flow HTTP handlers.
//!
//! This module implements the public endpoints the registration flow
//! calls before creating an account:
//! - POST /api/v1/registration/check - May this email register right now?
//! - POST /api/v1/invitations/validate - Is this invitation token good?

use crate::{
    error::AppError,
    models::{
        invite::{RegistrationCheckRequest, ValidateInviteData, ValidateInviteRequest},
        response::ApiResponse,
    },
    services::{
        invite_service,
        registration_gate::{self, GateOutcome},
        whitelist_service,
    },
    state::AppState,
};
use axum::{Json, extract::State};

/// Evaluate the registration gate for an email (public).
///
/// # Endpoint
///
/// `POST /api/v1/registration/check`
///
/// # Request Body
///
/// ```json
/// {
///   "email": "someone@example.com",
///   "invite_token": "3f2a…"
/// }
/// ```
///
/// # Response (200 OK)
///
/// Always 200 for a well-formed email; the decision is in the payload.
///
/// ```json
/// {
///   "success": true,
///   "message": "Registration is by invitation only",
///   "data": {
///     "allowed": false,
///     "reason": "invitation_only"
///   }
/// }
/// ```
///
/// # Gate Order
///
/// Valid invite token → private-beta whitelist approval → open
/// registration → deny. A bad token is treated as no token.
pub async fn check_registration(
    State(state): State<AppState>,
    Json(request): Json<RegistrationCheckRequest>,
) -> Result<Json<ApiResponse<GateOutcome>>, AppError> {
    whitelist_service::validate_email(&request.email)?;

    let outcome = registration_gate::check(
        &state.pool,
        &state.config,
        &request.email,
        request.invite_token.as_deref(),
    )
    .await;

    Ok(Json(ApiResponse::ok(outcome.reason.message(), outcome)))
}

/// Validate an invitation token (public).
///
/// # Endpoint
///
/// `POST /api/v1/invitations/validate`
///
/// # Request Body
///
/// ```json
/// {
///   "email": "someone@example.com",
///   "token": "3f2a…"
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: token is bound to this email and still valid
/// - **400 Bad Request**: unknown token, wrong email, or expired
///   (an expired token is deleted on sight)
///
/// Validation does not consume the token; the activation flow deletes it
/// after the account is actually created.
pub async fn validate_invitation(
    State(state): State<AppState>,
    Json(request): Json<ValidateInviteRequest>,
) -> Result<Json<ApiResponse<ValidateInviteData>>, AppError> {
    let record = invite_service::validate(&state.pool, &request.email, &request.token).await?;

    Ok(Json(ApiResponse::ok(
        "Invitation is valid",
        ValidateInviteData {
            email: record.email,
            expires_at: record.expires_at,
        },
    )))
}
