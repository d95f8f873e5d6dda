//! Rate limiting middleware with swappable backends
//!
//! Two interchangeable limiters sit behind the [`RateLimiter`] trait: an
//! in-process token bucket (single bucket shared by all callers) and a
//! Redis fixed-window counter keyed per client identity for use across
//! multiple service instances. The strategy is chosen by configuration.
//!
//! Every request ends in one of three states: admitted (handler runs),
//! limited (429, handler never runs), or a limiter backend failure (500,
//! deliberately distinct from 429 so an unreachable Redis is never mistaken
//! for throttling).

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::ops::DerefMut;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use deadpool_redis::Pool as RedisPool;
use governor::{DefaultDirectRateLimiter, Quota};
use tracing::warn;

use crate::{
    config::RateLimitConfig,
    error::{Error, Result},
    state::AppState,
};

/// Authenticated principal, set as a request extension by upstream auth
///
/// When present, the distributed limiter keys on the user instead of the
/// client IP.
#[derive(Debug, Clone)]
pub struct UserId(pub String);

/// Allowance snapshot for response headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitInfo {
    /// Maximum requests in the window
    pub limit: u32,
    /// Requests left in the window after this one
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_secs: u64,
}

/// Outcome of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Request may proceed. The token bucket carries no allowance info; the
    /// fixed-window limiter reports it for response headers.
    Admitted(Option<LimitInfo>),
    /// Request is rejected without being queued
    Limited {
        /// Seconds until a retry may succeed, when the backend can tell
        retry_after_secs: Option<u64>,
        /// Allowance snapshot for response headers
        info: Option<LimitInfo>,
    },
}

/// Admission check capability
///
/// A backend failure is an `Err`, never a silent admit or reject.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check and consume allowance for one request
    async fn admit(&self, identity: &str) -> Result<Decision>;
}

/// In-process token bucket shared across all callers
///
/// Capacity is the burst size; tokens refill at the sustained rate. The
/// check never blocks or queues.
pub struct TokenBucketLimiter {
    bucket: DefaultDirectRateLimiter,
}

impl TokenBucketLimiter {
    /// Create a bucket refilling at `requests_per_second` with `burst` capacity
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst.max(1)).unwrap_or(NonZeroU32::MIN);

        Self {
            bucket: DefaultDirectRateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn admit(&self, _identity: &str) -> Result<Decision> {
        match self.bucket.check() {
            Ok(()) => Ok(Decision::Admitted(None)),
            Err(_) => Ok(Decision::Limited {
                retry_after_secs: None,
                info: None,
            }),
        }
    }
}

/// Redis fixed-window counter keyed per client identity
///
/// INCR the per-identity key, set its expiry on the first hit of the window,
/// and read the TTL for the reset hint.
pub struct RedisFixedWindowLimiter {
    pool: RedisPool,
    limit: u32,
    window_secs: u64,
}

impl RedisFixedWindowLimiter {
    /// Create a limiter allowing `limit` requests per `window_secs` window
    pub fn new(pool: RedisPool, limit: u32, window_secs: u64) -> Self {
        Self {
            pool,
            limit,
            window_secs,
        }
    }
}

#[async_trait]
impl RateLimiter for RedisFixedWindowLimiter {
    async fn admit(&self, identity: &str) -> Result<Decision> {
        let key = format!("rate_limit:{}", identity);

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| Error::LimiterUnavailable(e.to_string()))?;

        let count: u64 = redis::cmd("INCR")
            .arg(&key)
            .query_async(conn.deref_mut())
            .await?;

        // First hit in this window starts the clock
        if count == 1 {
            let _: () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(self.window_secs as i64)
                .query_async(conn.deref_mut())
                .await?;
        }

        let ttl: i64 = redis::cmd("TTL")
            .arg(&key)
            .query_async(conn.deref_mut())
            .await?;

        let reset_secs = if ttl > 0 {
            ttl as u64
        } else {
            self.window_secs
        };

        if count > u64::from(self.limit) {
            warn!(
                "Rate limit exceeded for {}: {} requests (limit: {})",
                key, count, self.limit
            );
            return Ok(Decision::Limited {
                retry_after_secs: Some(reset_secs),
                info: Some(LimitInfo {
                    limit: self.limit,
                    remaining: 0,
                    reset_secs,
                }),
            });
        }

        Ok(Decision::Admitted(Some(LimitInfo {
            limit: self.limit,
            remaining: self.limit.saturating_sub(count as u32),
            reset_secs,
        })))
    }
}

/// Construct the limiter named by configuration
pub fn build_limiter(
    config: &RateLimitConfig,
    redis: Option<RedisPool>,
) -> Result<Arc<dyn RateLimiter>> {
    match config.strategy.as_str() {
        "local" => Ok(Arc::new(TokenBucketLimiter::new(
            config.requests_per_second,
            config.burst_size,
        ))),
        "redis" => {
            let pool = redis.ok_or_else(|| {
                Error::Internal("rate limit strategy 'redis' requires a Redis pool".to_string())
            })?;
            Ok(Arc::new(RedisFixedWindowLimiter::new(
                pool,
                config.per_window,
                config.window_secs,
            )))
        }
        other => Err(Error::Internal(format!(
            "unknown rate limit strategy: {}",
            other
        ))),
    }
}

/// Gate a request through the configured limiter
///
/// Limited requests get a 429 with `X-RateLimit-*` and `Retry-After` headers
/// when the limiter can report them; the handler is never invoked. Limiter
/// backend failures surface as 500.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let identity = client_identity(&request);

    match state.limiter.admit(&identity).await? {
        Decision::Admitted(info) => {
            let mut response = next.run(request).await;
            if let Some(info) = info {
                add_limit_headers(&mut response, &info);
            }
            Ok(response)
        }
        Decision::Limited {
            retry_after_secs,
            info,
        } => {
            let mut response = Error::RateLimited { retry_after_secs }.into_response();
            if let Some(info) = info {
                add_limit_headers(&mut response, &info);
            }
            if let Some(secs) = retry_after_secs {
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            Ok(response)
        }
    }
}

/// Resolve the client identity used as the limiter key
///
/// Authenticated user first, then the first `x-forwarded-for` hop, then the
/// peer address.
fn client_identity(request: &Request<Body>) -> String {
    if let Some(user) = request.extensions().get::<UserId>() {
        return format!("user:{}", user.0);
    }

    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            let ip = ip.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn add_limit_headers(response: &mut Response, info: &LimitInfo) {
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(&info.limit.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-limit"), value);
    }

    if let Ok(value) = HeaderValue::from_str(&info.remaining.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-remaining"), value);
    }

    let reset_timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() + info.reset_secs)
        .unwrap_or(0);

    if let Ok(value) = HeaderValue::from_str(&reset_timestamp.to_string()) {
        headers.insert(HeaderName::from_static("x-ratelimit-reset"), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_bucket_admits_burst_then_limits() {
        let limiter = TokenBucketLimiter::new(1, 5);

        let mut admitted = 0;
        let mut limited = 0;
        for _ in 0..6 {
            match limiter.admit("anyone").await.unwrap() {
                Decision::Admitted(_) => admitted += 1,
                Decision::Limited { .. } => limited += 1,
            }
        }

        assert_eq!(admitted, 5);
        assert_eq!(limited, 1);
    }

    #[tokio::test]
    async fn test_token_bucket_is_identity_blind() {
        let limiter = TokenBucketLimiter::new(1, 2);

        assert!(matches!(
            limiter.admit("alice").await.unwrap(),
            Decision::Admitted(_)
        ));
        assert!(matches!(
            limiter.admit("bob").await.unwrap(),
            Decision::Admitted(_)
        ));
        // Bucket is shared, so a third caller is still rejected
        assert!(matches!(
            limiter.admit("carol").await.unwrap(),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn test_build_limiter_local() {
        let config = RateLimitConfig::default();
        assert!(build_limiter(&config, None).is_ok());
    }

    #[test]
    fn test_build_limiter_redis_without_pool_fails() {
        let config = RateLimitConfig {
            strategy: "redis".to_string(),
            ..RateLimitConfig::default()
        };
        assert!(build_limiter(&config, None).is_err());
    }

    #[test]
    fn test_build_limiter_unknown_strategy_fails() {
        let config = RateLimitConfig {
            strategy: "carrier-pigeon".to_string(),
            ..RateLimitConfig::default()
        };
        assert!(build_limiter(&config, None).is_err());
    }

    #[test]
    fn test_client_identity_prefers_user() {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(UserId("42".to_string()));
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));

        assert_eq!(client_identity(&request), "user:42");
    }

    #[test]
    fn test_client_identity_forwarded_for_first_hop() {
        let mut request = Request::new(Body::empty());
        request.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );

        assert_eq!(client_identity(&request), "203.0.113.9");
    }

    #[test]
    fn test_client_identity_falls_back_to_peer_addr() {
        let mut request = Request::new(Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("192.0.2.7:5555".parse().unwrap()));

        assert_eq!(client_identity(&request), "192.0.2.7");
    }

    #[test]
    fn test_client_identity_unknown_without_any_source() {
        let request = Request::new(Body::empty());
        assert_eq!(client_identity(&request), "unknown");
    }

    #[tokio::test]
    async fn test_middleware_admits_then_limits() {
        use axum::{http::StatusCode, routing::get, Router};
        use tower::ServiceExt;

        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:5432/unused")
            .unwrap();
        let limiter: Arc<dyn RateLimiter> = Arc::new(TokenBucketLimiter::new(1, 1));
        let state = AppState::new(crate::config::Config::default(), db, limiter);

        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ))
            .with_state(state);

        let first = app
            .clone()
            .oneshot(
                http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(
                http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_redis_limiter_backend_failure_is_error() {
        // Nothing listens on port 1; any command must surface as an error,
        // never as an admit or reject decision.
        let pool = deadpool_redis::Config::from_url("redis://127.0.0.1:1")
            .builder()
            .unwrap()
            .max_size(1)
            .runtime(deadpool_redis::Runtime::Tokio1)
            .build()
            .unwrap();
        let limiter = RedisFixedWindowLimiter::new(pool, 5, 60);

        assert!(limiter.admit("10.0.0.1").await.is_err());
    }
}
