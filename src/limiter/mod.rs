//! Per-client admission control.
//!
//! Fixed-window counters keyed by an opaque client identity. State is
//! in-memory only: a process restart forgets all windows, which is accepted
//! scope for this service and covered by tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::warn;

use crate::config::WindowConfig;

/// Admission decision for one client key.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RateLimitStatus {
    /// Whether the attempt is admitted.
    pub allowed: bool,
    /// Attempts left in the current window (after this attempt, if recorded).
    pub remaining: u32,
    /// Seconds until the current window resets.
    pub reset_after_secs: u64,
}

struct Window {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter with per-key counters.
///
/// Each operation class (summarize, tagging) gets its own instance so the
/// windows are independent. The map lock is held only for the counter
/// update, never across I/O.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<Mutex<HashMap<String, Window>>>,
    config: WindowConfig,
}

impl RateLimiter {
    /// Create a limiter allowing `max_attempts` per `window_secs`.
    pub fn new(config: WindowConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Read-only peek at a client's current window. Does not count as an
    /// attempt.
    pub fn check_limit(&self, client_id: &str) -> RateLimitStatus {
        self.check_limit_at(client_id, Instant::now())
    }

    /// Atomically count an attempt and report the admission decision.
    ///
    /// This is the operation admission control uses: the check and the
    /// increment happen under one lock acquisition, so two racing requests
    /// can never both take the last slot in a window.
    pub fn record_attempt(&self, client_id: &str) -> RateLimitStatus {
        self.record_attempt_at(client_id, Instant::now())
    }

    /// `check_limit` against an explicit clock instant (test hook).
    pub fn check_limit_at(&self, client_id: &str, now: Instant) -> RateLimitStatus {
        let window = Duration::from_secs(self.config.window_secs);
        let state = self.lock_state();

        match state.get(client_id) {
            Some(entry) if now.duration_since(entry.window_start) < window => {
                let elapsed = now.duration_since(entry.window_start);
                RateLimitStatus {
                    allowed: entry.count < self.config.max_attempts,
                    remaining: self.config.max_attempts.saturating_sub(entry.count),
                    reset_after_secs: (window - elapsed).as_secs(),
                }
            }
            // Unseen key, or a window that has already expired.
            _ => RateLimitStatus {
                allowed: true,
                remaining: self.config.max_attempts,
                reset_after_secs: self.config.window_secs,
            },
        }
    }

    /// `record_attempt` against an explicit clock instant (test hook).
    pub fn record_attempt_at(&self, client_id: &str, now: Instant) -> RateLimitStatus {
        let window = Duration::from_secs(self.config.window_secs);
        let mut state = self.lock_state();

        // Drop expired windows so abandoned client keys do not accumulate.
        state.retain(|_, entry| now.duration_since(entry.window_start) < window * 2);

        let entry = state.entry(client_id.to_string()).or_insert(Window {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        let allowed = entry.count < self.config.max_attempts;
        if allowed {
            entry.count += 1;
        }

        let elapsed = now.duration_since(entry.window_start);
        RateLimitStatus {
            allowed,
            remaining: self.config.max_attempts.saturating_sub(entry.count),
            reset_after_secs: (window - elapsed).as_secs(),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, HashMap<String, Window>> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("rate limiter lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
