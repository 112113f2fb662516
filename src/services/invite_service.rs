//! Invitation token issuance and validation.
//!
//! Tokens let an approved email complete registration while private beta
//! mode is on. The plaintext token leaves this module exactly once, at
//! issuance; only a salted HMAC-SHA256 hash is stored.
//!
//! # Single Use
//!
//! One live token per email (unique index; reissuing replaces). Expired
//! tokens are deleted the moment validation sees them; consumption after
//! successful account activation is the activation flow's job.

use crate::{
    db::DbPool,
    error::AppError,
    models::invite::{InviteToken, IssuedInvite},
    services::whitelist_service::normalize_email,
};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Generate the plaintext invitation token.
///
/// 64 hex characters (32 bytes of randomness), URL-safe as-is.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Generate the per-token salt used as the HMAC key.
fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Hash a token for storage: hex HMAC-SHA256 keyed with the salt.
fn hash_token(salt_hex: &str, token: &str) -> String {
    let salt = hex::decode(salt_hex).unwrap_or_default();
    let mut mac = HmacSha256::new_from_slice(&salt).expect("HMAC key length is valid");
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a presented token against the stored hash.
fn verify_token(salt_hex: &str, token: &str, expected_hash_hex: &str) -> bool {
    let Ok(expected) = hex::decode(expected_hash_hex) else {
        return false;
    };
    let salt = hex::decode(salt_hex).unwrap_or_default();
    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(token.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Issue an invitation token for an email.
///
/// # Process
///
/// 1. Generate token and salt
/// 2. Store email, salted hash, and expiry (`now + ttl_hours`)
/// 3. Return the plaintext token to the caller, the only time it is
///    ever available
///
/// Reissuing for the same email replaces the previous token, so at most
/// one invitation is live per address.
pub async fn issue(pool: &DbPool, email: &str, ttl_hours: i64) -> Result<IssuedInvite, AppError> {
    let email = normalize_email(email);
    let token = generate_token();
    let salt = generate_salt();
    let token_hash = hash_token(&salt, &token);
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    sqlx::query(
        "INSERT INTO invite_tokens (email, token_hash, salt, expires_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (email) DO UPDATE
         SET token_hash = EXCLUDED.token_hash,
             salt = EXCLUDED.salt,
             expires_at = EXCLUDED.expires_at,
             created_at = NOW()",
    )
    .bind(&email)
    .bind(&token_hash)
    .bind(&salt)
    .bind(expires_at)
    .execute(pool)
    .await?;

    tracing::info!(%email, %expires_at, "invitation token issued");

    Ok(IssuedInvite { token, expires_at })
}

/// Validate a presented invitation token.
///
/// # Checks
///
/// 1. A token record exists for the (normalized) email
/// 2. The presented token matches the stored salted hash (constant time)
/// 3. The validity window has not passed; an expired token is deleted
///    as a side effect
///
/// # Errors
///
/// - `InvitationInvalid`: no record, or hash mismatch
/// - `InvitationExpired`: window passed (record removed)
/// - `Database`: storage error
pub async fn validate(pool: &DbPool, email: &str, token: &str) -> Result<InviteToken, AppError> {
    let email = normalize_email(email);

    let record = sqlx::query_as::<_, InviteToken>(
        "SELECT id, email, token_hash, salt, expires_at, created_at
         FROM invite_tokens
         WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::InvitationInvalid)?;

    if !record.matches_email(&email) || !verify_token(&record.salt, token, &record.token_hash) {
        return Err(AppError::InvitationInvalid);
    }

    if record.is_expired(Utc::now()) {
        // Self-cleaning: a token seen past its window is gone for good
        sqlx::query("DELETE FROM invite_tokens WHERE id = $1")
            .bind(record.id)
            .execute(pool)
            .await?;
        return Err(AppError::InvitationExpired);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_and_salt_are_hex_of_expected_size() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));

        let salt = generate_salt();
        assert_eq!(salt.len(), 32);
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn hash_verifies_round_trip() {
        let token = generate_token();
        let salt = generate_salt();
        let hash = hash_token(&salt, &token);
        assert!(verify_token(&salt, &token, &hash));
    }

    #[test]
    fn tampered_token_fails_verification() {
        let token = generate_token();
        let salt = generate_salt();
        let hash = hash_token(&salt, &token);

        let mut tampered = token.clone();
        tampered.replace_range(0..1, if token.starts_with('0') { "1" } else { "0" });
        assert!(!verify_token(&salt, &tampered, &hash));
    }

    #[test]
    fn wrong_salt_fails_verification() {
        let token = generate_token();
        let hash = hash_token(&generate_salt(), &token);
        assert!(!verify_token(&generate_salt(), &token, &hash));
    }

    #[test]
    fn garbage_stored_hash_fails_closed() {
        assert!(!verify_token("00ff", "token", "not-hex"));
    }
}
