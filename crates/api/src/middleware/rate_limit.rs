//! Per-IP rate limiting of the login endpoint.

use std::net::IpAddr;
use std::num::NonZeroU32;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::client_ip;

/// Keyed GCRA limiter: every client IP gets its own bucket.
pub struct LoginRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    per_minute: u32,
}

impl LoginRateLimiter {
    /// `None` when the limit is 0 (disabled).
    pub fn new(per_minute: u32) -> Option<Self> {
        let quota = Quota::per_minute(NonZeroU32::new(per_minute)?);
        Some(Self {
            limiter: RateLimiter::keyed(quota),
            per_minute,
        })
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    /// `Err(retry_after_secs)` when `ip` is over its quota.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.limiter.check_key(&ip).map_err(|not_until| {
            not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        })
    }

    /// Drops buckets that are back to full, keeping memory bounded.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

impl std::fmt::Debug for LoginRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRateLimiter")
            .field("per_minute", &self.per_minute)
            .field("tracked_ips", &self.limiter.len())
            .finish()
    }
}

/// Route layer for `POST /admin/login`. Requests without a known client IP
/// pass through.
pub async fn login_rate_limit(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if let (Some(limiter), Some(ip)) = (state.login_limiter.as_ref(), client_ip(&req)) {
        if let Err(retry_after) = limiter.check(ip) {
            tracing::warn!(ip = %ip, retry_after, "Login rate limit exceeded");
            return ApiError::RateLimited { retry_after }.into_response();
        }
    }
    next.run(req).await
}
