//! Invitation token models and registration-flow request types.
//!
//! # Token Flow
//!
//! 1. An admin approves a whitelist request; the service issues a token
//! 2. The plaintext token is emailed to the approved address; it is
//!    returned exactly once and never retrievable again
//! 3. The registration flow presents the token together with the email;
//!    validation checks the salted hash, the email binding, and expiry
//!
//! # Security
//!
//! Only the HMAC-SHA256 hash (keyed with a random per-token salt) is
//! stored. Expired tokens are deleted on sight during validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invitation token record from the database.
///
/// # Database Table
///
/// Maps to the `invite_tokens` table. The unique index on `email` gives
/// one live token per address; reissuing replaces the previous row.
#[derive(Debug, Clone, FromRow)]
pub struct InviteToken {
    pub id: Uuid,

    /// Normalized email this token is bound to
    pub email: String,

    /// Hex HMAC-SHA256(salt, token); the plaintext is never stored
    pub token_hash: String,

    /// Hex-encoded random salt used as the HMAC key
    pub salt: String,

    /// End of the validity window
    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl InviteToken {
    /// Check whether the validity window has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Check whether this token is bound to the given (normalized) email.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// A freshly issued invitation.
///
/// Carries the plaintext token, the only time it exists outside the
/// email that delivers it.
#[derive(Debug)]
pub struct IssuedInvite {
    /// URL-safe hex token handed to the invited address
    pub token: String,

    pub expires_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/invitations/validate`.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "someone@example.com",
///   "token": "3f2a…"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct ValidateInviteRequest {
    pub email: String,
    pub token: String,
}

/// Data payload returned for a valid invitation.
#[derive(Debug, Serialize)]
pub struct ValidateInviteData {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Request body for the registration gate check.
///
/// # JSON Example
///
/// ```json
/// {
///   "email": "someone@example.com",
///   "invite_token": "3f2a…"
/// }
/// ```
///
/// The token is optional: without one the gate falls through to the
/// private-beta / open-registration rules.
#[derive(Debug, Deserialize)]
pub struct RegistrationCheckRequest {
    pub email: String,
    pub invite_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_at(expires_at: DateTime<Utc>) -> InviteToken {
        InviteToken {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            token_hash: String::new(),
            salt: String::new(),
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_is_strict() {
        let now = Utc::now();
        assert!(!token_at(now + Duration::hours(1)).is_expired(now));
        assert!(token_at(now - Duration::seconds(1)).is_expired(now));
        // the boundary instant is still valid
        assert!(!token_at(now).is_expired(now));
    }

    #[test]
    fn email_binding_ignores_case() {
        let token = token_at(Utc::now());
        assert!(token.matches_email("a@example.com"));
        assert!(token.matches_email("A@EXAMPLE.COM"));
        assert!(!token.matches_email("b@example.com"));
    }
}
