use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Day-count threshold beyond which scans and databases earn no compliance credit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecencyWindow {
    pub days: i64,
}

impl RecencyWindow {
    pub fn new(days: u32) -> Self {
        Self { days: days.into() }
    }

    /// Elapsed time is truncated to whole days, so something created exactly
    /// `days * 24h` ago is still in range. Timestamps in the future count as fresh.
    pub fn contains(&self, now: DateTime<Utc>, created_at: DateTime<Utc>) -> bool {
        (now - created_at).num_days() <= self.days
    }
}
