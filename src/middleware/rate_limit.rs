//! Per-IP rate limiting for the public submission endpoint.
//!
//! A fixed-window counter per client IP, kept in memory. The limiter only
//! guards the unauthenticated submit route; admin routes are already
//! gated by key authentication.
//!
//! Client IP resolution checks forwarded headers first so the limiter
//! works behind a reverse proxy:
//! 1. `X-Forwarded-For` (first entry)
//! 2. `X-Real-IP`
//! 3. `ConnectInfo` socket address
//!
//! When no client IP can be derived at all, the request is allowed
//! through (fail open): availability of the submission form wins over
//! throttling precision.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, state::AppState};

/// Entries above this count trigger an opportunistic sweep of stale
/// windows, bounding memory under address churn.
const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window counter keyed by client IP.
#[derive(Debug)]
pub struct SubmitRateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl SubmitRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request from `client`.
    ///
    /// Returns `Ok(())` while the client is within its window allowance,
    /// or `Err(retry_after_secs)` once the allowance is used up.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > PRUNE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(client.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        // Window elapsed: start a fresh one
        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        entry.count += 1;
        if entry.count > self.max_requests {
            let elapsed = now.duration_since(entry.started);
            let retry_after = self.window.saturating_sub(elapsed).as_secs().max(1);
            return Err(retry_after);
        }

        Ok(())
    }
}

/// Rate limiting middleware for the public submission route.
///
/// Resolves the client IP, consumes one slot from its window, and rejects
/// with 429 (and a `Retry-After` header, via `AppError`) when the window
/// allowance is exhausted.
pub async fn submit_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let connect_info = request.extensions().get::<ConnectInfo<SocketAddr>>().cloned();
    match extract_client_ip(&request, connect_info.as_ref()) {
        Some(ip) => {
            if let Err(retry_after_secs) = state.limiter.check(&ip) {
                tracing::warn!(client = %ip, "submission rate limit exceeded");
                return Err(AppError::RateLimited { retry_after_secs });
            }
        }
        None => {
            tracing::warn!("no client IP available, skipping submission rate limit");
        }
    }

    Ok(next.run(request).await)
}

/// Extract client IP from request, checking forwarded headers first.
fn extract_client_ip<B>(
    request: &axum::http::Request<B>,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(forwarded) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
    {
        // Take the first IP (client IP, before any proxies)
        if let Some(first_ip) = forwarded.split(',').next() {
            let first_ip = first_ip.trim();
            if !first_ip.is_empty() {
                return Some(first_ip.to_string());
            }
        }
    }

    if let Some(real_ip) = request
        .headers()
        .get("X-Real-IP")
        .and_then(|h| h.to_str().ok())
    {
        return Some(real_ip.to_string());
    }

    connect_info.map(|ci| ci.0.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn allows_up_to_max_requests() {
        let limiter = SubmitRateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_err());
    }

    #[test]
    fn clients_are_limited_independently() {
        let limiter = SubmitRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("5.6.7.8").is_ok());
        assert!(limiter.check("1.2.3.4").is_err());
    }

    #[test]
    fn window_resets_after_elapsing() {
        let limiter = SubmitRateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("1.2.3.4").is_ok());
        assert!(limiter.check("1.2.3.4").is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check("1.2.3.4").is_ok());
    }

    #[test]
    fn retry_after_is_at_least_one_second() {
        let limiter = SubmitRateLimiter::new(1, Duration::from_secs(60));
        limiter.check("1.2.3.4").unwrap();
        let retry_after = limiter.check("1.2.3.4").unwrap_err();
        assert!((1..=60).contains(&retry_after));
    }

    #[test]
    fn extract_ip_from_x_forwarded_for() {
        let request = Request::builder()
            .uri("/test")
            .header("X-Forwarded-For", "1.2.3.4, 5.6.7.8")
            .body(())
            .unwrap();

        let ip = extract_client_ip(&request, None);
        assert_eq!(ip, Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_ip_prefers_x_forwarded_for() {
        let request = Request::builder()
            .uri("/test")
            .header("X-Forwarded-For", "1.2.3.4")
            .header("X-Real-IP", "5.6.7.8")
            .body(())
            .unwrap();

        let ip = extract_client_ip(&request, None);
        assert_eq!(ip, Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_ip_returns_none_without_headers() {
        let request = Request::builder()
            .uri("/test")
            .body(())
            .unwrap();

        let ip = extract_client_ip(&request, None);
        assert_eq!(ip, None);
    }
}
