//! Whitelist service - Core business logic for the approval workflow.
//!
//! This service handles:
//! - Public submission with atomic duplicate handling
//! - Admin listing with pagination
//! - Review (approve/reject) with best-effort invitation dispatch
//! - Hard deletion
//! - The fail-closed approval check used by the registration gate
//!
//! # Concurrency
//!
//! The unique index on `whitelist_requests.email` is the serialization
//! point for concurrent submissions. Inserts go through
//! `ON CONFLICT DO NOTHING` and the rejected→pending reset is a
//! status-guarded UPDATE, so no check-then-write race can create a second
//! entry or revive a reviewed one.

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::whitelist::{
        ListRequestsData, ListedWhitelistRequest, MAX_NOTES_LEN, MAX_PAGE_SIZE, MAX_REASON_LEN,
        ReviewAction, WhitelistRequest, WhitelistStatus,
    },
    services::{invite_service, notification_service},
};
use uuid::Uuid;

const REQUEST_COLUMNS: &str =
    "id, email, status, reason, requested_at, reviewed_at, reviewed_by, notes";

/// Result of a successful submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// First request for this email: a new pending entry was created
    Created(WhitelistRequest),

    /// A rejected entry was reset to pending in place (same id)
    Resubmitted(WhitelistRequest),
}

/// What happened to the invitation email attached to an approval.
///
/// Dispatch is best-effort: a failure here never affects the persisted
/// review, only the message shown to the admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationDispatch {
    /// Rejection, or the admin opted out of sending
    NotRequested,
    Sent,
    Failed,
}

/// Result of a successful review.
#[derive(Debug)]
pub struct ReviewOutcome {
    pub request: WhitelistRequest,
    pub invitation: InvitationDispatch,
}

/// Normalize an email address for storage and lookup: trim and lower-case.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Syntactic email validation.
///
/// Deliberately shallow: one `@`, non-empty local part, dotted domain, no
/// whitespace. Deliverability is proven by the invitation email itself,
/// not guessed here.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::InvalidRequest("Email is required".to_string()));
    }
    if email.len() > 254 {
        return Err(AppError::InvalidRequest("Email is too long".to_string()));
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::InvalidRequest(
            "Email must not contain whitespace".to_string(),
        ));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AppError::InvalidRequest(
            "Email must contain an @ sign".to_string(),
        ));
    };
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(AppError::InvalidRequest(
            "Email address is not valid".to_string(),
        ));
    }
    Ok(())
}

fn validate_reason(reason: Option<&str>) -> Result<(), AppError> {
    if let Some(reason) = reason {
        if reason.chars().count() > MAX_REASON_LEN {
            return Err(AppError::InvalidRequest(format!(
                "Reason must be at most {MAX_REASON_LEN} characters"
            )));
        }
    }
    Ok(())
}

fn validate_notes(notes: Option<&str>) -> Result<(), AppError> {
    if let Some(notes) = notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(AppError::InvalidRequest(format!(
                "Notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }
    }
    Ok(())
}

/// How a submission must proceed given the current entry for the email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmitDecision {
    /// No entry yet: create a new pending one
    Create,
    /// A pending entry exists: conflict, no mutation
    ConflictPending,
    /// An approved entry exists: conflict, no mutation
    ConflictApproved,
    /// A rejected entry exists: reset it to pending in place
    Reset,
}

/// The submit side of the state machine.
///
/// Kept pure so the reachable transitions are testable without a
/// database; `submit_request` executes each decision atomically in SQL.
pub(crate) fn classify_submit(existing: Option<WhitelistStatus>) -> SubmitDecision {
    match existing {
        None => SubmitDecision::Create,
        Some(WhitelistStatus::Pending) => SubmitDecision::ConflictPending,
        Some(WhitelistStatus::Approved) => SubmitDecision::ConflictApproved,
        Some(WhitelistStatus::Rejected) => SubmitDecision::Reset,
    }
}

/// Handle a public whitelist submission.
///
/// # Process
///
/// 1. Validate and normalize the email, bound the reason length
/// 2. Attempt an atomic insert-if-absent (the unique index decides)
/// 3. On conflict, classify the existing entry: pending and approved are
///    terminal conflicts; rejected is reset to pending in place
///
/// # Errors
///
/// - `InvalidRequest`: malformed email or over-long reason
/// - `AlreadyPending` / `AlreadyApproved`: duplicate submission, no mutation
/// - `Database`: storage error
pub async fn submit_request(
    pool: &DbPool,
    email: &str,
    reason: Option<String>,
) -> Result<SubmitOutcome, AppError> {
    validate_email(email)?;
    validate_reason(reason.as_deref())?;
    let email = normalize_email(email);

    // Two passes cover the rare races where the conflicting entry is
    // deleted or reset between our insert attempt and classification.
    for _ in 0..2 {
        if let Some(created) = insert_if_absent(pool, &email, reason.as_deref()).await? {
            return Ok(SubmitOutcome::Created(created));
        }

        let Some(existing) = fetch_by_email(pool, &email).await? else {
            // The entry was deleted from under us; try the insert again
            continue;
        };

        match classify_submit(Some(existing.status)) {
            SubmitDecision::Create => unreachable!("an existing entry was fetched"),
            SubmitDecision::ConflictPending => return Err(AppError::AlreadyPending),
            SubmitDecision::ConflictApproved => return Err(AppError::AlreadyApproved),
            SubmitDecision::Reset => {
                if let Some(reset) = reset_rejected(pool, &email, reason.as_deref()).await? {
                    return Ok(SubmitOutcome::Resubmitted(reset));
                }
                // Lost the reset race to a concurrent submit or review;
                // classify the fresh state on the next pass
                continue;
            }
        }
    }

    // Concurrent submissions for the same email: someone else's request
    // is now pending, which is the correct public answer.
    Err(AppError::AlreadyPending)
}

async fn insert_if_absent(
    pool: &DbPool,
    email: &str,
    reason: Option<&str>,
) -> Result<Option<WhitelistRequest>, AppError> {
    let created = sqlx::query_as::<_, WhitelistRequest>(&format!(
        "INSERT INTO whitelist_requests (email, reason)
         VALUES ($1, $2)
         ON CONFLICT (email) DO NOTHING
         RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(email)
    .bind(reason)
    .fetch_optional(pool)
    .await?;

    Ok(created)
}

async fn fetch_by_email(
    pool: &DbPool,
    email: &str,
) -> Result<Option<WhitelistRequest>, AppError> {
    let request = sqlx::query_as::<_, WhitelistRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM whitelist_requests WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(request)
}

/// Reset a rejected entry back to pending, keeping its identity.
///
/// The status guard in the WHERE clause makes this a no-op when a
/// concurrent request already changed the entry.
async fn reset_rejected(
    pool: &DbPool,
    email: &str,
    reason: Option<&str>,
) -> Result<Option<WhitelistRequest>, AppError> {
    let reset = sqlx::query_as::<_, WhitelistRequest>(&format!(
        "UPDATE whitelist_requests
         SET status = 'pending',
             reason = $2,
             requested_at = NOW(),
             reviewed_at = NULL,
             reviewed_by = NULL,
             notes = NULL
         WHERE email = $1 AND status = 'rejected'
         RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(email)
    .bind(reason)
    .fetch_optional(pool)
    .await?;

    Ok(reset)
}

pub(crate) fn clamp_page(page: i64) -> i64 {
    page.max(1)
}

pub(crate) fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_PAGE_SIZE)
}

/// List whitelist requests for the admin surface.
///
/// Ordered by `requested_at` descending, optionally filtered by status,
/// with the reviewer's display name joined in. `limit` is clamped to
/// [`MAX_PAGE_SIZE`] no matter what the caller asks for.
pub async fn list_requests(
    pool: &DbPool,
    status: Option<WhitelistStatus>,
    page: i64,
    limit: i64,
) -> Result<ListRequestsData, AppError> {
    let page = clamp_page(page);
    let limit = clamp_limit(limit);
    let offset = (page - 1) * limit;

    let requests = sqlx::query_as::<_, ListedWhitelistRequest>(
        "SELECT w.id, w.email, w.status, w.reason, w.requested_at,
                w.reviewed_at, w.reviewed_by, a.admin_name AS reviewed_by_name, w.notes
         FROM whitelist_requests w
         LEFT JOIN admin_keys a ON a.id = w.reviewed_by
         WHERE ($1::text IS NULL OR w.status = $1)
         ORDER BY w.requested_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM whitelist_requests WHERE ($1::text IS NULL OR status = $1)",
    )
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(ListRequestsData {
        requests,
        total,
        page,
        limit,
    })
}

/// Review a pending whitelist request.
///
/// # Process
///
/// 1. Bound the notes length
/// 2. Atomically transition the entry out of `pending` (status-guarded
///    UPDATE records reviewer and timestamp in the same statement)
/// 3. Distinguish "not found" from "already reviewed" when the guard
///    matched nothing
/// 4. On approval with `send_invitation`, issue a token and dispatch the
///    invitation email. Best-effort: the persisted approval is
///    authoritative either way
///
/// # Errors
///
/// - `InvalidRequest`: over-long notes
/// - `RequestNotFound`: unknown id
/// - `AlreadyReviewed`: the entry already left `pending`
/// - `Database`: storage error
pub async fn review_request(
    pool: &DbPool,
    config: &Config,
    request_id: Uuid,
    action: ReviewAction,
    reviewer_id: Uuid,
    notes: Option<String>,
    send_invitation: bool,
) -> Result<ReviewOutcome, AppError> {
    validate_notes(notes.as_deref())?;

    let new_status = match action {
        ReviewAction::Approve => WhitelistStatus::Approved,
        ReviewAction::Reject => WhitelistStatus::Rejected,
    };

    let updated = sqlx::query_as::<_, WhitelistRequest>(&format!(
        "UPDATE whitelist_requests
         SET status = $2, reviewed_at = NOW(), reviewed_by = $3, notes = $4
         WHERE id = $1 AND status = 'pending'
         RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(request_id)
    .bind(new_status)
    .bind(reviewer_id)
    .bind(notes)
    .fetch_optional(pool)
    .await?;

    let Some(request) = updated else {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM whitelist_requests WHERE id = $1)")
                .bind(request_id)
                .fetch_one(pool)
                .await?;
        return Err(if exists {
            AppError::AlreadyReviewed
        } else {
            AppError::RequestNotFound
        });
    };

    let invitation = if action == ReviewAction::Approve && send_invitation {
        dispatch_invitation(pool, config, &request.email).await
    } else {
        InvitationDispatch::NotRequested
    };

    tracing::info!(
        request_id = %request.id,
        email = %request.email,
        status = ?request.status,
        reviewer = %reviewer_id,
        "whitelist request reviewed"
    );

    Ok(ReviewOutcome {
        request,
        invitation,
    })
}

/// Issue a token and send the invitation email.
///
/// The approval is already persisted when this runs; failures are logged
/// and folded into the outcome message, never propagated.
async fn dispatch_invitation(pool: &DbPool, config: &Config, email: &str) -> InvitationDispatch {
    let invite = match invite_service::issue(pool, email, config.invite_ttl_hours).await {
        Ok(invite) => invite,
        Err(e) => {
            tracing::error!(%email, "failed to issue invitation token: {e}");
            return InvitationDispatch::Failed;
        }
    };

    match notification_service::send_invitation_email(config, email, &invite).await {
        Ok(()) => InvitationDispatch::Sent,
        Err(e) => {
            tracing::error!(%email, "failed to send invitation email: {e:#}");
            InvitationDispatch::Failed
        }
    }
}

/// Hard delete a whitelist request, whatever its status.
///
/// # Errors
///
/// - `RequestNotFound`: unknown id
/// - `Database`: storage error
pub async fn delete_request(pool: &DbPool, request_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM whitelist_requests WHERE id = $1")
        .bind(request_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::RequestNotFound);
    }

    Ok(())
}

/// Whether the email has an approved whitelist entry.
///
/// This is the registration gate's read path, so it fails closed: any
/// storage error is logged and reported as "not approved" rather than
/// propagated to the caller.
pub async fn is_approved(pool: &DbPool, email: &str) -> bool {
    let email = normalize_email(email);

    let approved = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM whitelist_requests WHERE email = $1 AND status = 'approved')",
    )
    .bind(&email)
    .fetch_one(pool)
    .await;

    match approved {
        Ok(approved) => approved,
        Err(e) => {
            tracing::warn!(%email, "approval check failed, denying: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  A@Example.COM  "), "a@example.com");
        assert_eq!(normalize_email("a@x.com"), "a@x.com");
    }

    #[test]
    fn valid_emails_pass() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.co").is_ok());
        // surrounding whitespace is trimmed away by normalization
        assert!(validate_email("  a@x.com  ").is_ok());
    }

    #[test]
    fn malformed_emails_fail() {
        for email in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@@example.com",
            "user@nodot",
            "user@.com",
            "user@domain.",
            "us er@example.com",
        ] {
            assert!(validate_email(email).is_err(), "accepted {email:?}");
        }
    }

    #[test]
    fn overlong_email_fails() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&email).is_err());
    }

    #[test]
    fn reason_and_notes_bounds() {
        assert!(validate_reason(Some(&"x".repeat(MAX_REASON_LEN))).is_ok());
        assert!(validate_reason(Some(&"x".repeat(MAX_REASON_LEN + 1))).is_err());
        assert!(validate_reason(None).is_ok());
        assert!(validate_notes(Some(&"x".repeat(MAX_NOTES_LEN))).is_ok());
        assert!(validate_notes(Some(&"x".repeat(MAX_NOTES_LEN + 1))).is_err());
    }

    #[test]
    fn submit_state_machine_is_closed() {
        // create → pending
        assert_eq!(classify_submit(None), SubmitDecision::Create);
        // pending and approved are terminal for submissions
        assert_eq!(
            classify_submit(Some(WhitelistStatus::Pending)),
            SubmitDecision::ConflictPending
        );
        assert_eq!(
            classify_submit(Some(WhitelistStatus::Approved)),
            SubmitDecision::ConflictApproved
        );
        // rejected → pending is the only resubmission path
        assert_eq!(
            classify_submit(Some(WhitelistStatus::Rejected)),
            SubmitDecision::Reset
        );
    }

    #[test]
    fn page_and_limit_are_clamped() {
        assert_eq!(clamp_page(0), 1);
        assert_eq!(clamp_page(-5), 1);
        assert_eq!(clamp_page(3), 3);
        assert_eq!(clamp_limit(200), MAX_PAGE_SIZE);
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-1), 1);
        assert_eq!(clamp_limit(20), 20);
    }
}
