//! Whitelist request models and API request/response types.
//!
//! This module defines:
//! - `WhitelistStatus`: the three-state approval state machine
//! - `WhitelistRequest`: database entity, one row per email
//! - Request types for public submission and admin review
//! - Response views for the public and admin surfaces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of the requester-supplied reason text.
pub const MAX_REASON_LEN: usize = 500;

/// Maximum length of the admin review notes.
pub const MAX_NOTES_LEN: usize = 1000;

/// Hard cap on the admin listing page size, regardless of what the
/// caller asks for.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Approval state of a whitelist request.
///
/// # Transitions
///
/// - created as `Pending`
/// - `Pending` → `Approved` or `Rejected` via admin review
/// - `Rejected` → `Pending` via resubmission
///
/// `Approved` is terminal: approved entries can be neither resubmitted
/// nor re-reviewed (only deleted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WhitelistStatus {
    Pending,
    Approved,
    Rejected,
}

/// Represents a whitelist request record from the database.
///
/// # Database Table
///
/// Maps to the `whitelist_requests` table. The `email` column carries a
/// unique index, which is what serializes concurrent submissions for the
/// same address.
///
/// # Review Invariant
///
/// `reviewed_at` and `reviewed_by` are set exactly when `status` leaves
/// `pending`, and cleared again when a rejected entry is resubmitted.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WhitelistRequest {
    /// Unique identifier for this request
    pub id: Uuid,

    /// Normalized (trimmed, lower-cased) email address
    pub email: String,

    /// Current approval state
    pub status: WhitelistStatus,

    /// Free text supplied by the requester, if any
    pub reason: Option<String>,

    /// When the request was created or last resubmitted
    pub requested_at: DateTime<Utc>,

    /// When an admin reviewed the request; null while pending
    pub reviewed_at: Option<DateTime<Utc>>,

    /// Admin key id of the reviewer; null while pending
    pub reviewed_by: Option<Uuid>,

    /// Admin free text set at review time
    pub notes: Option<String>,
}

/// A whitelist request joined with the reviewer's display name,
/// as returned by the admin listing.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ListedWhitelistRequest {
    pub id: Uuid,
    pub email: String,
    pub status: WhitelistStatus,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,

    /// Display name of the reviewing admin, resolved from `admin_keys`
    pub reviewed_by_name: Option<String>,

    pub notes: Option<String>,
}

/// Request body for the public submission endpoint.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "someone@example.com",
///   "reason": "I'd like to try the beta"
/// }
/// ```
///
/// # Validation
///
/// - `email`: required, syntactically valid, normalized before storage
/// - `reason`: optional, at most 500 characters
#[derive(Debug, Deserialize)]
pub struct SubmitWhitelistRequest {
    /// Email address asking for access
    pub email: String,

    /// Optional free-text motivation
    pub reason: Option<String>,
}

/// Review decision taken by an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

/// Request body for the admin review endpoint.
///
/// # JSON Example
///
/// ```json
/// {
///   "action": "approve",
///   "notes": "verified with the requester",
///   "send_invitation": true
/// }
/// ```
///
/// # Validation
///
/// - `action`: required, `approve` or `reject`
/// - `notes`: optional, at most 1000 characters
/// - `send_invitation`: optional, defaults to true; only meaningful on approve
#[derive(Debug, Deserialize)]
pub struct ReviewWhitelistRequest {
    /// Whether to approve or reject the pending request
    pub action: ReviewAction,

    /// Optional reviewer notes
    pub notes: Option<String>,

    /// Dispatch an invitation email after a successful approval
    #[serde(default = "default_send_invitation")]
    pub send_invitation: bool,
}

fn default_send_invitation() -> bool {
    true
}

/// Query parameters for the admin listing endpoint.
///
/// `page` defaults to 1, `limit` to 20; `limit` is clamped to
/// [`MAX_PAGE_SIZE`] by the service.
#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    /// Restrict the listing to one status; unset means all
    pub status: Option<WhitelistStatus>,

    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

/// Data payload of the admin listing response.
#[derive(Debug, Serialize)]
pub struct ListRequestsData {
    pub requests: Vec<ListedWhitelistRequest>,

    /// Total number of matching requests across all pages
    pub total: i64,

    pub page: i64,

    /// Effective (clamped) page size
    pub limit: i64,
}

/// Public view of a whitelist request, returned to the submitter.
///
/// This strips the review fields: the public endpoint never reveals who
/// reviewed a request or what the admin noted.
#[derive(Debug, Serialize)]
pub struct PublicWhitelistRequest {
    pub id: Uuid,
    pub email: String,
    pub status: WhitelistStatus,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
}

impl From<WhitelistRequest> for PublicWhitelistRequest {
    fn from(request: WhitelistRequest) -> Self {
        Self {
            id: request.id,
            email: request.email,
            status: request.status,
            reason: request.reason,
            requested_at: request.requested_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WhitelistStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&WhitelistStatus::Approved).unwrap(),
            "\"approved\""
        );
    }

    #[test]
    fn review_action_parses_lowercase() {
        let action: ReviewAction = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(action, ReviewAction::Approve);
        assert!(serde_json::from_str::<ReviewAction>("\"Approve\"").is_err());
    }

    #[test]
    fn send_invitation_defaults_to_true() {
        let request: ReviewWhitelistRequest =
            serde_json::from_str(r#"{"action": "approve"}"#).unwrap();
        assert!(request.send_invitation);
        assert!(request.notes.is_none());
    }

    #[test]
    fn list_query_defaults() {
        let query: ListRequestsQuery = serde_json::from_str("{}").unwrap();
        assert!(query.status.is_none());
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 20);
    }

    #[test]
    fn public_view_strips_review_fields() {
        let request = WhitelistRequest {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            status: WhitelistStatus::Approved,
            reason: None,
            requested_at: Utc::now(),
            reviewed_at: Some(Utc::now()),
            reviewed_by: Some(Uuid::new_v4()),
            notes: Some("internal".to_string()),
        };
        let public = PublicWhitelistRequest::from(request);
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("reviewed_by").is_none());
        assert!(json.get("notes").is_none());
    }
}
