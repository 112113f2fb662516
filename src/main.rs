//! Whitelist Approval Service - Main Application Entry Point
//!
//! This is a REST API server for an email-whitelist / invitation approval
//! workflow: the public submits access requests, admins approve or reject
//! them, approvals can send a single-use invitation token by email, and a
//! registration gate decides who may create an account.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Admin Authentication**: bearer keys with SHA-256 hashing
//! - **Invitations**: salted-hash-at-rest tokens, emailed via an HTTP provider
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::rate_limit::SubmitRateLimiter;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let server_port = config.server_port;
    let limiter = SubmitRateLimiter::new(
        config.submit_rate_limit_max,
        Duration::from_secs(config.submit_rate_limit_window_secs),
    );
    let state = AppState {
        pool,
        config: Arc::new(config),
        limiter: Arc::new(limiter),
    };

    // Admin routes (review surface), gated by admin key authentication
    let admin_routes = Router::new()
        .route(
            "/api/v1/whitelist-requests",
            get(handlers::whitelist::list_requests),
        )
        .route(
            "/api/v1/whitelist-requests/{id}",
            put(handlers::whitelist::review_request),
        )
        .route(
            "/api/v1/whitelist-requests/{id}",
            delete(handlers::whitelist::delete_request),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    // Public submission route, throttled per client IP
    let submission_routes = Router::new()
        .route(
            "/api/v1/whitelist-requests",
            post(handlers::whitelist::submit_request),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::submit_rate_limit_middleware,
        ));

    // Combine with the remaining public routes
    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/registration/check",
            post(handlers::registration::check_registration),
        )
        .route(
            "/api/v1/invitations/validate",
            post(handlers::registration::validate_invitation),
        )
        .merge(submission_routes)
        .merge(admin_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // The submission form is served from a browser frontend
        .layer(CorsLayer::permissive())
        // Share state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // ConnectInfo gives the rate limiter a client address to key on
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
