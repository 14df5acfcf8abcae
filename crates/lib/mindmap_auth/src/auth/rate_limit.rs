//! Login attempt throttling.
//!
//! Per-identifier sliding window with a block cooldown. Attempts are counted
//! from the first attempt of the current window; reaching the maximum blocks
//! the identifier for the block duration. A successful login removes the
//! record outright.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;

/// Default number of attempts before the identifier is blocked.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default attempt window: 15 minutes.
pub const DEFAULT_WINDOW: Duration = Duration::minutes(15);

/// Default block duration: 15 minutes.
pub const DEFAULT_BLOCK: Duration = Duration::minutes(15);

/// Default reaper period: 1 hour.
pub const DEFAULT_REAP_PERIOD: std::time::Duration = std::time::Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct AttemptRecord {
    count: u32,
    first_attempt: DateTime<Utc>,
    blocked_at: Option<DateTime<Utc>>,
}

/// In-memory, per-identifier attempt counter.
pub struct RateLimiter {
    attempts: RwLock<HashMap<String, AttemptRecord>>,
    max_attempts: u32,
    window: Duration,
    block: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration, block: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
            max_attempts,
            window,
            block,
            clock,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn block(&self) -> Duration {
        self.block
    }

    /// Whether `identifier` may attempt to authenticate now.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        let attempts = self.attempts.read().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = attempts.get(identifier) else {
            return true;
        };
        let now = self.clock.now();

        if let Some(blocked_at) = record.blocked_at {
            // A served block lifts the denial; the next attempt opens a new window.
            return now - blocked_at >= self.block;
        }
        if now - record.first_attempt > self.window {
            return true;
        }
        record.count < self.max_attempts
    }

    /// Count one attempt against `identifier`.
    pub fn record_attempt(&self, identifier: &str) {
        let now = self.clock.now();
        let mut attempts = self.attempts.write().unwrap_or_else(PoisonError::into_inner);

        let Some(record) = attempts.get_mut(identifier) else {
            attempts.insert(
                identifier.to_string(),
                AttemptRecord {
                    count: 1,
                    first_attempt: now,
                    blocked_at: None,
                },
            );
            return;
        };

        let block_served = record.blocked_at.is_some_and(|at| now - at >= self.block);
        if block_served || now - record.first_attempt > self.window {
            *record = AttemptRecord {
                count: 1,
                first_attempt: now,
                blocked_at: None,
            };
            return;
        }

        record.count = record.count.saturating_add(1);
        if record.count >= self.max_attempts && record.blocked_at.is_none() {
            record.blocked_at = Some(now);
            warn!(identifier, attempts = record.count, "identifier blocked after repeated attempts");
        }
    }

    /// Forget everything about `identifier`.
    pub fn reset(&self, identifier: &str) {
        self.attempts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier);
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.attempts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop records whose window lapsed without a block, or whose block has
    /// been served. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut attempts = self.attempts.write().unwrap_or_else(PoisonError::into_inner);
        let before = attempts.len();
        attempts.retain(|_, record| match record.blocked_at {
            Some(blocked_at) => now - blocked_at <= self.block,
            None => now - record.first_attempt <= self.window,
        });
        before - attempts.len()
    }

    /// Run [`purge_expired`](Self::purge_expired) every `period` until `cancel`
    /// fires.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        period: std::time::Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = limiter.purge_expired();
                        if removed > 0 {
                            debug!(removed, remaining = limiter.tracked(), "rate limiter sweep");
                        }
                    }
                }
            }
            debug!("rate limiter reaper stopped");
        })
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_attempts", &self.max_attempts)
            .field("window", &self.window)
            .field("block", &self.block)
            .field("tracked", &self.tracked())
            .finish()
    }
}
