//! Dashboard counters over an owner's shares.

use std::sync::Arc;

use chrono::{Local, LocalResult, TimeZone, Timelike};

use crate::services::clock::{Clock, SystemClock};
use crate::storage::ShareStore;
use crate::types::errors::ShareError;
use crate::types::share::ShareRecord;
use crate::types::stats::ShareStats;

/// Shares lapsing within this many seconds count as "expiring soon".
pub const EXPIRING_SOON_SECS: i64 = 1800;

/// Computes counters for `shares` at `now`. `day_start` is the first second
/// of the current day in the operator's time zone.
pub fn compute_stats(shares: &[ShareRecord], now: i64, day_start: i64) -> ShareStats {
    let mut stats = ShareStats::default();
    for share in shares {
        if share.is_live_at(now) {
            stats.active_count += 1;
        }
        if share.created_at >= day_start {
            stats.created_today_count += 1;
        }
        if share.is_active() {
            if let Some(deadline) = share.expires_at() {
                if now < deadline && deadline < now + EXPIRING_SOON_SECS {
                    stats.expiring_soon_count += 1;
                }
            }
        }
        if share.viewed() {
            stats.viewed_count += 1;
        }
    }
    stats
}

/// Local midnight of the day containing `now`.
///
/// Falls back to `now` itself when the timestamp cannot be mapped into the
/// local zone, and to the earlier instant when midnight is ambiguous.
pub fn local_day_start(now: i64) -> i64 {
    let (LocalResult::Single(local) | LocalResult::Ambiguous(local, _)) = Local.timestamp_opt(now, 0) else {
        return now;
    };
    let Some(midnight) = local.date_naive().and_hms_opt(0, 0, 0) else {
        return now;
    };
    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(start) | LocalResult::Ambiguous(start, _) => start.timestamp(),
        // midnight skipped by a DST jump; the day starts at the first valid instant
        LocalResult::None => now - i64::from(local.num_seconds_from_midnight()),
    }
}

/// Reads shares from a store and computes [`ShareStats`].
pub struct StatsAggregator {
    shares: Arc<dyn ShareStore>,
    clock: Arc<dyn Clock>,
}

impl StatsAggregator {
    pub fn new(shares: Arc<dyn ShareStore>) -> Self {
        Self {
            shares,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn get_stats(&self, owner_id: &str) -> Result<ShareStats, ShareError> {
        let now = self.clock.now();
        let shares = self.shares.list_shares(owner_id)?;
        Ok(compute_stats(&shares, now, local_day_start(now)))
    }
}
