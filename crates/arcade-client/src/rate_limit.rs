//! Sliding-window login throttle.
//!
//! Attempt timestamps are persisted in the store's `meta` collection, so
//! the window survives restarts and is shared by every vault opened on the
//! same database.

use std::time::Duration;

use arcade_shared::constants::{LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW_SECS};
use arcade_store::{Database, StoreError};

/// At most `max_attempts` login attempts within any trailing `window`.
#[derive(Debug, Clone)]
pub struct LoginRateLimiter {
    max_attempts: usize,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }

    /// Check whether an attempt at `now_ms` is allowed, recording it if so.
    ///
    /// Timestamps older than the window are dropped first.  A denied
    /// attempt leaves the persisted list untouched.
    pub fn can_attempt(&self, db: &Database, now_ms: i64) -> Result<bool, StoreError> {
        let mut recent = self.recent(db, now_ms)?;
        if recent.len() >= self.max_attempts {
            tracing::warn!(attempts = recent.len(), "login attempt throttled");
            return Ok(false);
        }

        recent.push(now_ms);
        db.set_login_attempts(recent)?;
        Ok(true)
    }

    /// Attempts left in the current window, without recording one.
    pub fn remaining(&self, db: &Database, now_ms: i64) -> Result<usize, StoreError> {
        Ok(self.max_attempts.saturating_sub(self.recent(db, now_ms)?.len()))
    }

    fn recent(&self, db: &Database, now_ms: i64) -> Result<Vec<i64>, StoreError> {
        let window_ms = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);
        Ok(db
            .login_attempts()?
            .into_iter()
            .filter(|&t| now_ms - t < window_ms)
            .collect())
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(LOGIN_MAX_ATTEMPTS, Duration::from_secs(LOGIN_WINDOW_SECS))
    }
}
