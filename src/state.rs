//! Shared application state.
//!
//! Handlers and middleware receive this via Axum's `State` extractor.
//! Cloning is cheap: the pool is internally reference-counted and the
//! config and limiter are behind `Arc`.

use std::sync::Arc;

use crate::{config::Config, db::DbPool, middleware::rate_limit::SubmitRateLimiter};

/// State shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: DbPool,

    /// Loaded application configuration
    pub config: Arc<Config>,

    /// Per-IP limiter for the public submission endpoint
    pub limiter: Arc<SubmitRateLimiter>,
}
