//! Admin key model for authentication.
//!
//! Admin keys authenticate the review endpoints (list, approve/reject,
//! delete). They are stored in the database as SHA-256 hashes; the
//! plaintext key is handed to the administrator out of band.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an admin key record from the database.
///
/// # Database Table
///
/// Maps to the `admin_keys` table with columns:
/// - `id`: Unique identifier (UUID); this is the reviewer identity recorded
///   on whitelist requests
/// - `key_hash`: SHA-256 hash of the actual key
/// - `admin_name`: Display name of the administrator, joined into request
///   listings
/// - `created_at`: When the key was created
/// - `is_active`: Whether the key is currently valid
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdminKey {
    /// Unique identifier for this admin key
    pub id: Uuid,

    /// SHA-256 hash of the actual key (64 hex characters)
    pub key_hash: String,

    /// Display name of the administrator using this key
    pub admin_name: String,

    /// Timestamp when this key was created
    pub created_at: DateTime<Utc>,

    /// Whether this key is currently active
    ///
    /// Inactive keys are rejected during authentication. This provides a way to revoke access without deleting the record.
    pub is_active: bool,
}
