//! # Quota Governor
//! Hard daily cap on enrichment calls. One mutex guards the
//! check-and-increment pair so that two concurrent callers can never
//! both take the last unit; day rollover is applied before the limit is
//! evaluated, so the counter resets mid-process without a restart.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Default daily cap on real-time enrichment calls.
pub const DEFAULT_DAILY_LIMIT: u32 = 6;

#[derive(Debug, Clone, Copy)]
struct QuotaState {
    date_key: NaiveDate,
    calls_used: u32,
}

/// Snapshot for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub date_key: NaiveDate,
    pub calls_used_today: u32,
    pub daily_limit: u32,
    pub remaining: u32,
}

#[derive(Debug)]
pub struct QuotaGovernor {
    inner: Mutex<QuotaState>,
    daily_limit: u32,
}

impl QuotaGovernor {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            inner: Mutex::new(QuotaState {
                date_key: Utc::now().date_naive(),
                calls_used: 0,
            }),
            daily_limit,
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Atomic check-and-increment. Returns true when a unit of budget was
    /// consumed, false when today's budget is exhausted (state untouched).
    pub fn try_consume(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.inner.lock().expect("quota mutex poisoned");
        let today = now.date_naive();
        if state.date_key != today {
            state.date_key = today;
            state.calls_used = 0;
        }
        if state.calls_used < self.daily_limit {
            state.calls_used += 1;
            true
        } else {
            false
        }
    }

    /// Read-side snapshot; also applies day rollover so reported numbers
    /// never show yesterday's usage.
    pub fn status(&self, now: DateTime<Utc>) -> QuotaStatus {
        let mut state = self.inner.lock().expect("quota mutex poisoned");
        let today = now.date_naive();
        if state.date_key != today {
            state.date_key = today;
            state.calls_used = 0;
        }
        QuotaStatus {
            date_key: state.date_key,
            calls_used_today: state.calls_used,
            daily_limit: self.daily_limit,
            remaining: self.daily_limit.saturating_sub(state.calls_used),
        }
    }
}

impl Default for QuotaGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT)
    }
}
