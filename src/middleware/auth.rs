//! Admin key authentication middleware.
//!
//! This middleware intercepts every review request to:
//! 1. Extract the admin key from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject the reviewer's identity into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{error::AppError, models::admin_key::AdminKey, state::AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Reviewer identity attached to authenticated admin requests.
///
/// This struct is inserted into the request's extension map; the review
/// handler extracts it and records `admin_id` as the reviewer of the
/// whitelist request.
#[derive(Debug, Clone)]
pub struct AdminContext {
    /// ID of the authenticated admin key: the reviewer identity
    pub admin_id: Uuid,

    /// Display name of the administrator
    pub admin_name: String,
}

/// Hash an admin key the way it is stored at rest.
///
/// SHA-256, hex-encoded: 64 lowercase hex characters.
pub fn hash_admin_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Admin key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Query database for a matching active key
/// 4. If found: inject `AdminContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer abc123xyz
/// ```
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidAdminKey)?;

    // Expected format: "Bearer <admin_key>"
    let admin_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidAdminKey)?;

    let key_hash = hash_admin_key(admin_key);

    let record = sqlx::query_as::<_, AdminKey>(
        "SELECT id, key_hash, admin_name, created_at, is_active
         FROM admin_keys
         WHERE key_hash = $1 AND is_active = true",
    )
    .bind(&key_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidAdminKey)?;

    // Handlers can now extract this using Extension<AdminContext>
    request.extensions_mut().insert(AdminContext {
        admin_id: record.id,
        admin_name: record.admin_name,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex_sha256() {
        let hash = hash_admin_key("secret-key");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_admin_key("secret-key"));
    }

    #[test]
    fn different_keys_hash_differently() {
        assert_ne!(hash_admin_key("key-a"), hash_admin_key("key-b"));
    }
}
