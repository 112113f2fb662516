//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls into the service layer
//! 3. Returns HTTP response (JSON, status code)

/// Service health endpoint
pub mod health;
/// Registration gate and invitation validation endpoints
pub mod registration;
/// Whitelist submission and review endpoints
pub mod whitelist;
