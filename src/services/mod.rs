//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They own the database writes, the approval state machine, token
//! issuance, and invitation dispatch.

/// Invitation token issuance and validation
pub mod invite_service;
/// Best-effort invitation email dispatch
pub mod notification_service;
/// Registration gate evaluation
pub mod registration_gate;
/// Whitelist approval workflow
pub mod whitelist_service;
