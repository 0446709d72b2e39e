//! Per-user quota windows: accumulate usage and check at block
//! boundaries, raising `QUOTA_EXPIRED` on threshold breach.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{EngineError, EngineResult, ErrorCode};

#[derive(Debug, Clone, Copy, Default)]
pub struct QuotaUsage {
    pub queries: u64,
    pub errors: u64,
    pub result_rows: u64,
    pub result_bytes: u64,
    pub read_rows: u64,
    pub read_bytes: u64,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    pub max_queries: Option<u64>,
    pub max_errors: Option<u64>,
    pub max_result_rows: Option<u64>,
    pub max_result_bytes: Option<u64>,
    pub max_read_rows: Option<u64>,
    pub max_read_bytes: Option<u64>,
    pub max_execution_time_ms: Option<u64>,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            max_queries: None,
            max_errors: None,
            max_result_rows: None,
            max_result_bytes: None,
            max_read_rows: None,
            max_read_bytes: None,
            max_execution_time_ms: None,
        }
    }
}

struct Window {
    limits: QuotaLimits,
    usage: QuotaUsage,
}

/// Holds one rolling window per user name. A real deployment resets windows
/// on a schedule (per-interval quotas); this tracks a single open window per
/// user and leaves periodic reset to the caller via `reset`.
pub struct QuotaTracker {
    windows: Mutex<HashMap<String, Window>>,
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self { windows: Mutex::new(HashMap::new()) }
    }

    pub fn configure(&self, user: &str, limits: QuotaLimits) {
        let mut windows = self.windows.lock().unwrap();
        windows.insert(user.to_string(), Window { limits, usage: QuotaUsage::default() });
    }

    pub fn reset(&self, user: &str) {
        let mut windows = self.windows.lock().unwrap();
        if let Some(window) = windows.get_mut(user) {
            window.usage = QuotaUsage::default();
        }
    }

    pub fn usage(&self, user: &str) -> QuotaUsage {
        self.windows.lock().unwrap().get(user).map(|w| w.usage).unwrap_or_default()
    }

    /// Charges one query's worth of usage and checks every configured
    /// threshold. Called at block boundaries ; an over-limit
    /// dimension raises `QuotaExpired` and still records the charge (the
    /// caller decides whether to abort the query).
    pub fn charge(&self, user: &str, delta: &QuotaUsage) -> EngineResult<()> {
        let mut windows = self.windows.lock().unwrap();
        let window = match windows.get_mut(user) {
            Some(w) => w,
            None => return Ok(()),
        };
        window.usage.queries += delta.queries;
        window.usage.errors += delta.errors;
        window.usage.result_rows += delta.result_rows;
        window.usage.result_bytes += delta.result_bytes;
        window.usage.read_rows += delta.read_rows;
        window.usage.read_bytes += delta.read_bytes;
        window.usage.execution_time_ms += delta.execution_time_ms;

        check(window.usage.queries, window.limits.max_queries, "queries")?;
        check(window.usage.errors, window.limits.max_errors, "errors")?;
        check(window.usage.result_rows, window.limits.max_result_rows, "result_rows")?;
        check(window.usage.result_bytes, window.limits.max_result_bytes, "result_bytes")?;
        check(window.usage.read_rows, window.limits.max_read_rows, "read_rows")?;
        check(window.usage.read_bytes, window.limits.max_read_bytes, "read_bytes")?;
        check(window.usage.execution_time_ms, window.limits.max_execution_time_ms, "execution_time")?;
        Ok(())
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn check(actual: u64, limit: Option<u64>, dimension: &str) -> EngineResult<()> {
    if let Some(limit) = limit {
        if actual > limit {
            return Err(EngineError::new(ErrorCode::QuotaExpired, format!("{dimension} quota exceeded: {actual} > {limit}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_accumulates_across_calls() {
        let tracker = QuotaTracker::new();
        tracker.configure("alice", QuotaLimits::default());
        tracker.charge("alice", &QuotaUsage { read_rows: 10, ..Default::default() }).unwrap();
        tracker.charge("alice", &QuotaUsage { read_rows: 5, ..Default::default() }).unwrap();
        assert_eq!(tracker.usage("alice").read_rows, 15);
    }

    #[test]
    fn exceeding_a_limit_raises_quota_expired() {
        let tracker = QuotaTracker::new();
        tracker.configure("bob", QuotaLimits { max_read_rows: Some(100), ..Default::default() });
        let err = tracker.charge("bob", &QuotaUsage { read_rows: 150, ..Default::default() }).unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExpired);
    }

    #[test]
    fn reset_clears_the_window() {
        let tracker = QuotaTracker::new();
        tracker.configure("carol", QuotaLimits::default());
        tracker.charge("carol", &QuotaUsage { queries: 1, ..Default::default() }).unwrap();
        tracker.reset("carol");
        assert_eq!(tracker.usage("carol").queries, 0);
    }

    #[test]
    fn unconfigured_user_is_unmetered() {
        let tracker = QuotaTracker::new();
        assert!(tracker.charge("nobody", &QuotaUsage { queries: 1_000_000, ..Default::default() }).is_ok());
    }
}
