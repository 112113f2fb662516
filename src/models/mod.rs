//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response types of the HTTP surface.

/// Admin key authentication model
pub mod admin_key;
/// Invitation token model and registration-flow payloads
pub mod invite;
/// Success response envelope
pub mod response;
/// Whitelist request model and approval state machine
pub mod whitelist;
