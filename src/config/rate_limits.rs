use std::time::{SystemTime, UNIX_EPOCH};

/// Per-user action quotas. Each action is counted in exactly one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub votes_per_hour: u32,
    pub flags_per_hour: u32,
    pub replies_per_hour: u32,
    pub interpretations_per_day: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            votes_per_hour: 120,
            flags_per_hour: 20,
            replies_per_hour: 30,
            interpretations_per_day: 20,
        }
    }
}

impl RateLimits {
    pub fn limit_for_action(&self, action: &str) -> Option<(u32, RateWindow)> {
        match action {
            "vote" => Some((self.votes_per_hour, RateWindow::Hour)),
            "flag" => Some((self.flags_per_hour, RateWindow::Hour)),
            "reply" => Some((self.replies_per_hour, RateWindow::Hour)),
            "interpretation" => Some((self.interpretations_per_day, RateWindow::Day)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateWindow {
    Hour,
    Day,
}

impl RateWindow {
    pub fn seconds(&self) -> u64 {
        match self {
            RateWindow::Hour => 3600,
            RateWindow::Day => 86400,
        }
    }
}

/// Index of the fixed window containing "now".
pub fn current_window(window_seconds: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    now / window_seconds
}
