use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Serialize)]
struct RateLimitError {
    error: String,
    message: String,
    retry_after: u64,
}

/// Fixed-window request counter keyed by caller. Windows live in-process;
/// counts reset when the window elapses or the service restarts.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Clone, Copy)]
struct Window {
    count: u32,
    started_at: u64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a request is allowed
    /// Returns (is_allowed, retry_after_seconds)
    pub async fn check_rate_limit(
        &self,
        key: &str,
        max_requests: u32,
        window_seconds: u64,
    ) -> (bool, Option<u64>) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
        });

        if now.saturating_sub(window.started_at) >= window_seconds {
            // Window expired, start a new one
            *window = Window {
                count: 1,
                started_at: now,
            };
            (true, None)
        } else if window.count >= max_requests {
            let retry_after = window_seconds - now.saturating_sub(window.started_at);
            (false, Some(retry_after))
        } else {
            window.count += 1;
            (true, None)
        }
    }
}

/// Extract IP address from request headers
fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|h| h.to_str().ok()))
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

fn too_many_requests(message: String, retry_after: u64) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitError {
            error: "rate_limit_exceeded".to_string(),
            message,
            retry_after,
        }),
    )
        .into_response()
}

/// Rate limit middleware for login attempts
/// 5 requests per 60 seconds per IP
pub async fn rate_limit_login(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(request.headers());

    match limiter.check_rate_limit(&format!("login:{}", ip), 5, 60).await {
        (true, _) => Ok(next.run(request).await),
        (false, retry_after) => {
            tracing::warn!("Rate limit exceeded for login from IP: {}", ip);
            let retry_after = retry_after.unwrap_or(60);
            Err(too_many_requests(
                format!(
                    "Too many login attempts. Please try again in {} seconds.",
                    retry_after
                ),
                retry_after,
            ))
        }
    }
}

/// Rate limit middleware for registration
/// 3 requests per 300 seconds (5 minutes) per IP
pub async fn rate_limit_registration(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(request.headers());

    match limiter
        .check_rate_limit(&format!("register:{}", ip), 3, 300)
        .await
    {
        (true, _) => Ok(next.run(request).await),
        (false, retry_after) => {
            tracing::warn!("Rate limit exceeded for registration from IP: {}", ip);
            let retry_after = retry_after.unwrap_or(300);
            Err(too_many_requests(
                format!(
                    "Too many registration attempts. Please try again in {} seconds.",
                    retry_after
                ),
                retry_after,
            ))
        }
    }
}

/// Rate limit middleware for two-factor login completion.
/// Staged tokens are replayable until expiry, so code guesses are throttled
/// like password attempts: 5 requests per 60 seconds per IP.
pub async fn rate_limit_two_factor(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_ip(request.headers());

    match limiter.check_rate_limit(&format!("2fa:{}", ip), 5, 60).await {
        (true, _) => Ok(next.run(request).await),
        (false, retry_after) => {
            tracing::warn!("Rate limit exceeded for two-factor login from IP: {}", ip);
            let retry_after = retry_after.unwrap_or(60);
            Err(too_many_requests(
                format!(
                    "Too many verification attempts. Please try again in {} seconds.",
                    retry_after
                ),
                retry_after,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            let (allowed, _) = limiter.check_rate_limit("login:1.2.3.4", 5, 60).await;
            assert!(allowed);
        }

        let (allowed, retry_after) = limiter.check_rate_limit("login:1.2.3.4", 5, 60).await;
        assert!(!allowed);
        assert!(retry_after.unwrap() <= 60);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            limiter.check_rate_limit("login:1.2.3.4", 5, 60).await;
        }

        let (allowed, _) = limiter.check_rate_limit("login:5.6.7.8", 5, 60).await;
        assert!(allowed);
    }
}
