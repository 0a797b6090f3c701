//! Per-client sliding-window timestamp store.
//!
//! Each client owns an ordered sequence of admission timestamps. A window is
//! created lazily on the client's first request and pruned lazily on every
//! later one; [`ClientWindowStore::evict_idle`] drops windows nobody touched
//! for a full window length.
//!
//! Concurrency: the map is a [`DashMap`], so different clients contend at
//! most on a shard lock. Prune, append and count for one client happen while
//! holding that client's entry guard, which serializes concurrent callers
//! with the same identity.

use std::collections::VecDeque;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Coarse, unauthenticated identity used to partition rate-limit state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Identity used when the transport cannot tell us who is calling.
    pub const UNKNOWN: &'static str = "unknown";

    /// Build an identity from an arbitrary key. Empty keys map to [`Self::UNKNOWN`].
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.is_empty() {
            Self(Self::UNKNOWN.to_string())
        } else {
            Self(key)
        }
    }

    /// Identity derived from the peer address: the IP, without the port.
    pub fn from_peer(addr: Option<SocketAddr>) -> Self {
        match addr {
            Some(addr) => Self(addr.ip().to_string()),
            None => Self(Self::UNKNOWN.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of one client's window right after a request was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Timestamps in the window, including the one just recorded.
    pub count: usize,
    /// Oldest timestamp still inside the window.
    pub oldest: Instant,
}

/// Holds the recent request timestamps of every client.
pub struct ClientWindowStore {
    windows: DashMap<ClientId, VecDeque<Instant>>,
    window: Duration,
}

impl ClientWindowStore {
    pub fn new(window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            window,
        }
    }

    /// Window length this store prunes against.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Prune the client's window, append `now`, and return the window size.
    pub fn record_and_count(&self, client: &ClientId, now: Instant) -> usize {
        self.record(client, now).count
    }

    /// Like [`record_and_count`](Self::record_and_count) but also reports the
    /// oldest surviving timestamp, read under the same lock.
    pub fn record(&self, client: &ClientId, now: Instant) -> WindowSnapshot {
        let mut entry = self.windows.entry(client.clone()).or_default();
        let timestamps = entry.value_mut();

        prune(timestamps, now, self.window);

        // Keep the sequence non-decreasing even if a caller sampled `now`
        // before a racing caller for the same client took the lock.
        let stamp = match timestamps.back() {
            Some(&last) if last > now => last,
            _ => now,
        };
        timestamps.push_back(stamp);

        WindowSnapshot {
            count: timestamps.len(),
            oldest: timestamps.front().copied().unwrap_or(stamp),
        }
    }

    /// Number of requests currently counted for `client`, without recording one.
    pub fn count(&self, client: &ClientId, now: Instant) -> usize {
        self.windows
            .get(client)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .filter(|&&t| in_window(t, now, self.window))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Remove windows whose newest timestamp has aged out. Returns how many were dropped.
    ///
    /// A window that qualifies would prune to empty on its next access, so
    /// eviction never changes an admission decision.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|&newest| in_window(newest, now, self.window))
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients with a window.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn in_window(t: Instant, now: Instant, window: Duration) -> bool {
    now.saturating_duration_since(t) < window
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = timestamps.front() {
        if in_window(front, now, window) {
            break;
        }
        timestamps.pop_front();
    }
}
