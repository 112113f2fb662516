//! Registration gate: may this email create an account right now?
//!
//! Evaluation order:
//! 1. A valid, unexpired invitation token always allows; it bypasses the
//!    private-beta restriction
//! 2. Private beta enabled: allow only approved whitelist emails
//! 3. Open registration enabled: allow
//! 4. Otherwise: deny
//!
//! The decision itself is a pure function over four booleans; the async
//! wrapper resolves those inputs and fails closed (a storage error denies
//! rather than propagating).

use serde::Serialize;

use crate::{
    config::Config,
    db::DbPool,
    services::{invite_service, whitelist_service},
};

/// Why the gate allowed or denied a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    /// Allowed: a valid invitation token was presented
    InviteToken,
    /// Allowed: private beta is on and the email is whitelist-approved
    WhitelistApproved,
    /// Allowed: registration is open to everyone
    OpenRegistration,
    /// Denied: private beta is on and the email is neither invited nor approved
    InvitationOnly,
    /// Denied: registration is closed
    RegistrationClosed,
}

impl GateReason {
    /// Human-readable message for the API response.
    pub fn message(self) -> &'static str {
        match self {
            GateReason::InviteToken => "Registration allowed with invitation",
            GateReason::WhitelistApproved => "Registration allowed, email is approved",
            GateReason::OpenRegistration => "Registration is open",
            GateReason::InvitationOnly => "Registration is by invitation only",
            GateReason::RegistrationClosed => "Registration is currently closed",
        }
    }
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateOutcome {
    pub allowed: bool,
    pub reason: GateReason,
}

/// The gate decision, factored out of I/O.
pub(crate) fn decide(
    invite_valid: bool,
    private_beta: bool,
    open_registration: bool,
    approved: bool,
) -> GateOutcome {
    if invite_valid {
        return GateOutcome {
            allowed: true,
            reason: GateReason::InviteToken,
        };
    }
    if private_beta {
        return if approved {
            GateOutcome {
                allowed: true,
                reason: GateReason::WhitelistApproved,
            }
        } else {
            GateOutcome {
                allowed: false,
                reason: GateReason::InvitationOnly,
            }
        };
    }
    if open_registration {
        return GateOutcome {
            allowed: true,
            reason: GateReason::OpenRegistration,
        };
    }
    GateOutcome {
        allowed: false,
        reason: GateReason::RegistrationClosed,
    }
}

/// Evaluate the registration gate for an email.
///
/// A presented token that fails validation for any reason (unknown,
/// mismatched, expired, storage error) simply counts as "no invite";
/// the remaining rules still apply. The whitelist lookup is only made
/// when the decision depends on it.
pub async fn check(
    pool: &DbPool,
    config: &Config,
    email: &str,
    invite_token: Option<&str>,
) -> GateOutcome {
    let invite_valid = match invite_token {
        Some(token) => invite_service::validate(pool, email, token).await.is_ok(),
        None => false,
    };

    let approved = if !invite_valid && config.private_beta_enabled {
        whitelist_service::is_approved(pool, email).await
    } else {
        false
    };

    let outcome = decide(
        invite_valid,
        config.private_beta_enabled,
        config.open_registration_enabled,
        approved,
    );

    tracing::debug!(
        email = %whitelist_service::normalize_email(email),
        allowed = outcome.allowed,
        reason = ?outcome.reason,
        "registration gate evaluated"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_invite_always_allows() {
        // even with private beta on and nothing else in the email's favor
        for private_beta in [false, true] {
            for open_registration in [false, true] {
                let outcome = decide(true, private_beta, open_registration, false);
                assert!(outcome.allowed);
                assert_eq!(outcome.reason, GateReason::InviteToken);
            }
        }
    }

    #[test]
    fn private_beta_requires_approval() {
        let denied = decide(false, true, true, false);
        assert!(!denied.allowed);
        assert_eq!(denied.reason, GateReason::InvitationOnly);

        let allowed = decide(false, true, false, true);
        assert!(allowed.allowed);
        assert_eq!(allowed.reason, GateReason::WhitelistApproved);
    }

    #[test]
    fn open_registration_allows_when_beta_off() {
        let outcome = decide(false, false, true, false);
        assert!(outcome.allowed);
        assert_eq!(outcome.reason, GateReason::OpenRegistration);
    }

    #[test]
    fn everything_off_denies() {
        let outcome = decide(false, false, false, false);
        assert!(!outcome.allowed);
        assert_eq!(outcome.reason, GateReason::RegistrationClosed);
    }

    #[test]
    fn approval_is_irrelevant_outside_private_beta() {
        // approved flag must not open a closed registration
        let outcome = decide(false, false, false, true);
        assert!(!outcome.allowed);
        assert_eq!(outcome.reason, GateReason::RegistrationClosed);
    }
}
