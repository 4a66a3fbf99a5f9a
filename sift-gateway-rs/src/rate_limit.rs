// sift-gateway-rs/src/rate_limit.rs
//
// Request rate limiting
// Provides:
// - Per-caller request budgets over a fixed window
// - In-memory sliding window backend (single instance)
// - Redis INCR/EXPIRE backend (shared across instances), failing open
// - Middleware that rejects with 429 and stamps X-Rate-Limit headers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::AppState;

/// Outcome of a budget check. Returned for allowed and rejected
/// requests alike so headers can always be stamped.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Count one request against `identifier` and decide whether it is
    /// within budget.
    async fn check(&self, identifier: &str, limit: u32, window_secs: u64) -> RateLimitDecision;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Sliding-window limiter held in process memory.
#[derive(Default)]
pub struct MemoryRateLimiter {
    windows: RwLock<HashMap<String, Vec<(u64, u32)>>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    fn evaluate(
        entries: &mut Vec<(u64, u32)>,
        limit: u32,
        window_secs: u64,
        now: u64,
    ) -> RateLimitDecision {
        entries.retain(|(stamp, _)| now.saturating_sub(*stamp) < window_secs);
        let total: u32 = entries.iter().map(|(_, count)| count).sum();

        if total >= limit {
            let reset_secs = entries
                .iter()
                .map(|(stamp, _)| *stamp)
                .min()
                .map(|oldest| (oldest + window_secs).saturating_sub(now))
                .unwrap_or(window_secs);
            return RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_secs,
            };
        }

        entries.push((now, 1));
        RateLimitDecision {
            allowed: true,
            limit,
            remaining: limit - (total + 1),
            reset_secs: window_secs,
        }
    }
}

#[async_trait]
impl RateLimitBackend for MemoryRateLimiter {
    async fn check(&self, identifier: &str, limit: u32, window_secs: u64) -> RateLimitDecision {
        let now = unix_now();
        let mut windows = self.windows.write().await;
        let entries = windows.entry(identifier.to_string()).or_default();
        Self::evaluate(entries, limit, window_secs, now)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Redis backend
// ---------------------------------------------------------------------------

/// Counter-per-window limiter backed by Redis, for deployments with
/// more than one gateway instance.
pub struct RedisRateLimiter {
    conn: redis::aio::ConnectionManager,
}

impl RedisRateLimiter {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_tokio_connection_manager().await?;
        Ok(Self { conn })
    }

    async fn try_check(
        &self,
        identifier: &str,
        limit: u32,
        window_secs: u64,
    ) -> Result<RateLimitDecision, redis::RedisError> {
        let mut conn = self.conn.clone();
        let counter = format!("ratelimit:{}", identifier);

        let count: u64 = conn.incr(&counter, 1u32).await?;
        if count == 1 {
            let _: i64 = conn.expire(&counter, window_secs as usize).await?;
        }

        let ttl: i64 = conn.ttl(&counter).await?;
        let reset_secs = if ttl > 0 {
            ttl as u64
        } else {
            // Counter lost its expiry (crash between INCR and EXPIRE);
            // rearm it so the window cannot become permanent.
            let _: i64 = conn.expire(&counter, window_secs as usize).await?;
            window_secs
        };

        if count > u64::from(limit) {
            Ok(RateLimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_secs,
            })
        } else {
            Ok(RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit - count as u32,
                reset_secs,
            })
        }
    }
}

#[async_trait]
impl RateLimitBackend for RedisRateLimiter {
    async fn check(&self, identifier: &str, limit: u32, window_secs: u64) -> RateLimitDecision {
        match self.try_check(identifier, limit, window_secs).await {
            Ok(decision) => decision,
            Err(err) => {
                // Fail open: an unreachable limiter must not take the
                // API down with it.
                warn!("rate limit backend unavailable, allowing request: {}", err);
                RateLimitDecision {
                    allowed: true,
                    limit,
                    remaining: limit,
                    reset_secs: window_secs,
                }
            }
        }
    }
}

/// Pick the backend for this deployment: Redis when configured and
/// reachable, otherwise in-memory.
pub async fn build_limiter(redis_url: Option<&str>) -> Arc<dyn RateLimitBackend> {
    if let Some(url) = redis_url {
        match RedisRateLimiter::connect(url).await {
            Ok(backend) => {
                info!("rate limiting backed by redis");
                return Arc::new(backend);
            }
            Err(err) => warn!("redis unavailable ({}), using in-memory rate limiting", err),
        }
    }
    Arc::new(MemoryRateLimiter::new())
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = request
        .extensions()
        .get::<Caller>()
        .cloned()
        .unwrap_or_else(Caller::unknown);

    let (limit, window_secs) = if caller.is_authenticated() {
        (
            caller
                .rate_limit_override()
                .unwrap_or(state.config.auth_rate_limit),
            state.config.auth_rate_window_secs,
        )
    } else {
        (state.config.rate_limit, state.config.rate_window_secs)
    };

    let identifier = caller.limit_identifier();
    let decision = state.limiter.check(&identifier, limit, window_secs).await;
    if !decision.allowed {
        debug!(identifier = %identifier, "request over rate limit");
        return Err(ApiError::RateLimited { decision });
    }

    let mut response = next.run(request).await;
    attach_headers(response.headers_mut(), &decision);
    Ok(response)
}

pub fn attach_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert("x-rate-limit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-rate-limit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-rate-limit-reset", HeaderValue::from(decision.reset_secs));
}
