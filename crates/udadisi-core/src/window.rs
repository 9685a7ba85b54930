//! Query time windows.
//!
//! Bounds arrive as strings in the `YYYYMMDDHHMM` layout (`201508041434`)
//! or as RFC 3339. A bound that fails to parse is dropped with a warning
//! rather than failing the request.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tracing::warn;

use crate::error::TrendError;

/// Compact boundary layout, minutes resolution, interpreted as UTC.
pub const BOUND_FORMAT: &str = "%Y%m%d%H%M";

/// Parses one window boundary.
pub fn parse_bound(raw: &str) -> Result<DateTime<Utc>, TrendError> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, BOUND_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TrendError::InvalidWindow(raw.to_string()))
}

/// Resolved `[from, to]` bounds; `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Builds a window from raw query values.
    ///
    /// When `to` is absent and `from` parses, the window closes
    /// `interval_hours` after `from`; an interval of 0 leaves it open.
    pub fn resolve(from: Option<&str>, to: Option<&str>, interval_hours: u32) -> Self {
        let from = from.filter(|s| !s.trim().is_empty()).and_then(lenient);
        let to = match to.filter(|s| !s.trim().is_empty()) {
            Some(raw) => lenient(raw),
            None if interval_hours > 0 => from.and_then(|f| close_after(f, interval_hours)),
            None => None,
        };
        Self { from, to }
    }
}

fn close_after(from: DateTime<Utc>, interval_hours: u32) -> Option<DateTime<Utc>> {
    let to = from.checked_add_signed(Duration::hours(i64::from(interval_hours)));
    if to.is_none() {
        warn!(%from, interval_hours, "window end out of range; leaving it open");
    }
    to
}

fn lenient(raw: &str) -> Option<DateTime<Utc>> {
    match parse_bound(raw) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!(error = %e, "ignoring window bound");
            None
        }
    }
}
