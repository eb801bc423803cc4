use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::server::routes::ErrorResponse;

/// Login attempts allowed per peer per window.
pub const LOGIN_MAX_ATTEMPTS: u64 = 10;
pub const LOGIN_WINDOW: Duration = Duration::from_secs(60);

/// Per-peer fixed-window rate limiter.
///
/// Each peer gets `max_attempts` per `window`; excess requests are rejected
/// with 429 until the window resets. Runs BEFORE auth, so the key is the
/// peer address, not an authenticated identity.
#[derive(Clone)]
pub struct RateLimiter {
    inner: &'static RateLimiterInner,
}

struct RateLimiterInner {
    counters: Mutex<HashMap<String, WindowCounter>>,
    max_attempts: u64,
    window: Duration,
}

struct WindowCounter {
    count: u64,
    window_start: Instant,
}

impl RateLimiter {
    /// Create a rate limiter allowing `max_attempts` per `window` per peer.
    pub fn new(max_attempts: u64, window: Duration) -> Self {
        let inner = Box::leak(Box::new(RateLimiterInner {
            counters: Mutex::new(HashMap::new()),
            max_attempts,
            window,
        }));
        Self { inner }
    }

    /// Check if a request from `peer` is allowed. Returns `true` if under
    /// the limit, `false` if the peer should be throttled.
    pub fn check(&self, peer: &str) -> bool {
        let mut counters = self.inner.counters.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let counter = counters.entry(peer.to_string()).or_insert(WindowCounter {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(counter.window_start) >= self.inner.window {
            counter.count = 0;
            counter.window_start = now;
        }

        counter.count += 1;
        counter.count <= self.inner.max_attempts
    }
}

/// Axum middleware throttling the login endpoint.
///
/// Keys on the peer IP from `ConnectInfo` when the server was started with
/// connect info; falls back to a single shared bucket otherwise (tests,
/// unusual transports).
pub async fn login_rate_limit(req: Request, next: Next) -> Response {
    let limiter = req.extensions().get::<RateLimiter>().cloned();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip().to_string())
        .unwrap_or_else(|| "local".to_string());

    if let Some(limiter) = limiter {
        if !limiter.check(&peer) {
            log::warn!("AUDIT RATE_LIMITED peer={} path=/api/auth/login", peer);
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [("retry-after", "60")],
                Json(ErrorResponse {
                    success: false,
                    error: "Too many login attempts.".to_string(),
                }),
            )
                .into_response();
        }
    }

    next.run(req).await
}
