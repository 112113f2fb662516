//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Throttle requests
//! - Modify request/response
//! - Short-circuit requests (reject unauthorized)

/// Admin key authentication middleware
pub mod auth;
/// Per-IP rate limiting for the public submission endpoint
pub mod rate_limit;
