//! Sliding-window rate limiting middleware.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::http::error::ErrorResponder;
use crate::observability::metrics;
use crate::security::window_store::{ClientId, ClientWindowStore};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Quota exceeded. `retry_after` is a lower bound on when the oldest
    /// counted request leaves the window.
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }
}

/// Admits at most `max_requests` per client in any rolling window.
pub struct RateLimiter {
    store: ClientWindowStore,
    max_requests: usize,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            store: ClientWindowStore::new(window),
            max_requests,
            enabled: true,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            store: ClientWindowStore::new(config.window()),
            max_requests: config.max_requests,
            enabled: config.enabled,
        }
    }

    /// A limiter that admits everything and keeps no state.
    pub fn disabled() -> Self {
        Self {
            store: ClientWindowStore::new(Duration::ZERO),
            max_requests: usize::MAX,
            enabled: false,
        }
    }

    /// Decide whether `client` may proceed at `now`.
    ///
    /// The request is recorded before the quota check, so a rejected request
    /// still occupies a slot in the window.
    pub fn admit(&self, client: &ClientId, now: Instant) -> Admission {
        if !self.enabled {
            return Admission::Allowed;
        }

        let snapshot = self.store.record(client, now);
        if snapshot.count > self.max_requests {
            let release = snapshot.oldest + self.store.window();
            Admission::Rejected {
                retry_after: release.saturating_duration_since(now),
            }
        } else {
            Admission::Allowed
        }
    }

    /// Drop idle client windows. Returns the number evicted.
    pub fn sweep(&self, now: Instant) -> usize {
        let evicted = self.store.evict_idle(now);
        metrics::record_tracked_clients(self.store.len());
        evicted
    }

    pub fn store(&self) -> &ClientWindowStore {
        &self.store
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Periodically evict idle windows until shutdown is signalled.
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = limiter.sweep(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(
                            evicted,
                            remaining = limiter.store().len(),
                            "Evicted idle rate-limit windows"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate-limit sweeper stopping");
                    break;
                }
            }
        }
    })
}

/// Middleware gating every request on the client's sliding window.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = ClientId::from_peer(peer);

    match limiter.admit(&client, Instant::now()) {
        Admission::Allowed => next.run(request).await,
        Admission::Rejected { retry_after } => {
            tracing::warn!(
                client = %client,
                path = %request.uri().path(),
                retry_after_ms = retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            ErrorResponder::rate_limited(retry_after)
        }
    }
}
