//! Fixed-window, per-client rate limiting for the upload route.
//!
//! Counters live behind [`CounterStore`] so the in-memory map can be swapped for an external
//! cache. Every request performs one atomic increment-and-read against the store; the decision
//! is derived from the post-increment count, so concurrent requests from one client can never
//! both observe the same slot.

use async_trait::async_trait;
use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Body returned to over-limit clients.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Expired windows are swept once the map holds more than this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

/// Errors raised by a counter store.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Backing store could not be read or updated.
    #[error("Rate limit store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Counter state for one client after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests seen in the current window, including this one.
    pub hits: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

/// Storage for per-client window counters.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically count one request for `key` and return the window's state afterwards.
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, RateLimitError>;
}

#[derive(Debug, Clone, Copy)]
struct FixedWindow {
    started: Instant,
    hits: u32,
}

#[derive(Debug, Default)]
struct CounterMap {
    windows: HashMap<String, FixedWindow>,
    last_sweep: Option<Instant>,
}

impl CounterMap {
    /// Drop expired windows, at most once per window length, and only when a new client is
    /// about to be tracked on an oversized map.
    fn sweep_before_insert(&mut self, key: &str, window: Duration, now: Instant) {
        if self.windows.len() <= PRUNE_THRESHOLD || self.windows.contains_key(key) {
            return;
        }
        if self
            .last_sweep
            .is_some_and(|last| now.duration_since(last) < window)
        {
            return;
        }
        self.windows
            .retain(|_, entry| now.duration_since(entry.started) < window);
        self.last_sweep = Some(now);
    }
}

/// Process-local counter store.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<CounterMap>,
}

impl InMemoryCounterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `key` as of `now`.
    pub fn increment_at(
        &self,
        key: &str,
        window: Duration,
        now: Instant,
    ) -> Result<WindowCount, RateLimitError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| RateLimitError::StoreUnavailable("counter map poisoned".into()))?;

        counters.sweep_before_insert(key, window, now);

        let entry = counters.windows.entry(key.to_string()).or_insert(FixedWindow {
            started: now,
            hits: 0,
        });
        if now.duration_since(entry.started) >= window {
            *entry = FixedWindow {
                started: now,
                hits: 0,
            };
        }
        entry.hits = entry.hits.saturating_add(1);

        Ok(WindowCount {
            hits: entry.hits,
            reset_after: window.saturating_sub(now.duration_since(entry.started)),
        })
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.counters
            .lock()
            .map(|counters| counters.windows.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<WindowCount, RateLimitError> {
        self.increment_at(key, window, Instant::now())
    }
}

/// Outcome of checking one request against the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Requests allowed per window.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Time until the window resets.
    pub reset_after: Duration,
}

/// Per-client request limiter.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window` for each client.
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// Limiter backed by a fresh [`InMemoryCounterStore`].
    pub fn in_memory(max_requests: u32, window: Duration) -> Self {
        Self::new(Arc::new(InMemoryCounterStore::new()), max_requests, window)
    }

    /// Count a request from `client` and decide whether it may proceed.
    pub async fn check(&self, client: &str) -> Result<RateLimitDecision, RateLimitError> {
        let count = self.store.increment(client, self.window).await?;
        Ok(RateLimitDecision {
            allowed: count.hits <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count.hits),
            reset_after: count.reset_after,
        })
    }

    fn policy_header(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("{};w={}", self.max_requests, self.window.as_secs()))
            .unwrap_or_else(|_| HeaderValue::from_static("invalid"))
    }
}

fn decision_header(decision: &RateLimitDecision) -> HeaderValue {
    let reset = decision.reset_after.as_secs_f64().ceil() as u64;
    HeaderValue::from_str(&format!(
        "limit={}, remaining={}, reset={reset}",
        decision.limit, decision.remaining
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("invalid"))
}

fn apply_headers(headers: &mut HeaderMap, limiter: &RateLimiter, decision: &RateLimitDecision) {
    headers.insert("ratelimit-policy", limiter.policy_header());
    headers.insert("ratelimit", decision_header(decision));
}

/// Identify the client by peer IP address, falling back to a shared bucket when the server was
/// not started with connect info.
fn client_key(connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting over-limit clients before the handler reads the body.
pub async fn enforce_rate_limit(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(connect_info);
    let decision = match limiter.check(&client).await {
        Ok(decision) => decision,
        Err(error) => {
            tracing::warn!(client = %client, error = %error, "Rate limit check failed; allowing request");
            return next.run(request).await;
        }
    };

    if !decision.allowed {
        tracing::warn!(client = %client, limit = decision.limit, "Rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "msg": RATE_LIMIT_MESSAGE })),
        )
            .into_response();
        apply_headers(response.headers_mut(), &limiter, &decision);
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &limiter, &decision);
    response
}
