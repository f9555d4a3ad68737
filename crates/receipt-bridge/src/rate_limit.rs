//! Per-client fixed-window rate limiting for the print API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

struct IpEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    /// IP -> entry
    inner: Arc<Mutex<HashMap<String, IpEntry>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// `max_requests == 0` disables limiting
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(&self, ip: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        let mut map = self.inner.lock().await;
        let now = Instant::now();

        let entry = map.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= self.max_requests
    }

    /// Remove entries whose window has expired
    pub async fn cleanup(&self) {
        let mut map = self.inner.lock().await;
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, entry| now.duration_since(entry.window_start) < self.window);
        if map.len() != before {
            debug!(removed = before - map.len(), "Rate limiter entries expired");
        }
    }

    pub async fn tracked_clients(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Run `cleanup` every `every` until `cancel` fires
    pub fn spawn_cleanup(&self, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => limiter.cleanup().await,
                }
            }
        })
    }
}

/// Client key for rate limiting: the peer address, or the first
/// X-Forwarded-For entry when the proxy in front is trusted.
fn extract_ip(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for
        && let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
    {
        // X-Forwarded-For can be comma-separated; first entry is the original client
        if let Some(first) = val.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    // Fallback: peer address from extensions (ConnectInfo)
    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = extract_ip(&request, state.trust_forwarded_for);
    if !state.rate_limiter.check(&ip).await {
        warn!(client = %ip, "Rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_window_limits_and_resets() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("10.0.0.1").await);
        assert!(limiter.check("10.0.0.1").await);
        assert!(!limiter.check("10.0.0.1").await);
        // Other clients have their own window
        assert!(limiter.check("10.0.0.2").await);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.check("10.0.0.1").await);
    }

    fn request_from(peer: &str, forwarded_for: &str) -> Request {
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", forwarded_for)
            .body(axum::body::Body::empty())
            .unwrap();
        let addr: std::net::SocketAddr = peer.parse().unwrap();
        request
            .extensions_mut()
            .insert(axum::extract::ConnectInfo(addr));
        request
    }

    #[test]
    fn test_forwarded_header_ignored_unless_trusted() {
        let request = request_from("192.168.1.7:51000", "203.0.113.9, 10.0.0.1");
        assert_eq!(extract_ip(&request, false), "192.168.1.7");
        assert_eq!(extract_ip(&request, true), "203.0.113.9");
    }

    #[test]
    fn test_missing_peer_is_unknown() {
        let request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_ip(&request, false), "unknown");
    }

    #[tokio::test]
    async fn test_zero_disables_limit() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        for _ in 0..100 {
            assert!(limiter.check("10.0.0.1").await);
        }
        assert_eq!(limiter.tracked_clients().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_expired_entries() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        limiter.check("10.0.0.1").await;
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.check("10.0.0.2").await;

        tokio::time::advance(Duration::from_secs(31)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_clients().await, 1);
    }
}
