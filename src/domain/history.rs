//! Multi-day ranking history over a trailing window of snapshots.
//!
//! Windows are ordered newest first: `window[0]` is the selected day and
//! `window[1]` the trading day before it.

use crate::domain::market::{DailySnapshot, Market};
use chrono::NaiveDate;
use std::fmt;

/// Number of trading days compared by default.
pub const DEFAULT_WINDOW: usize = 10;

/// One day of a ticker's history. Fields are `None` on days it did not rank.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub rank: Option<u32>,
    pub trading_value: Option<f64>,
    pub close: Option<f64>,
    pub change_pct: Option<f64>,
}

impl HistoryPoint {
    pub fn is_ranked(&self) -> bool {
        self.rank.is_some()
    }
}

/// Days present out of days in the window.
///
/// This is a presence count, not a run of consecutive days: a ticker that
/// ranked on days 0, 3 and 7 of a ten-day window has `count == 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streak {
    pub count: usize,
    pub total: usize,
}

impl Streak {
    /// Badge is shown once there are two days to compare and two hits.
    pub fn shows_badge(&self) -> bool {
        self.total >= 2 && self.count >= 2
    }
}

impl fmt::Display for Streak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.count, self.total)
    }
}

/// Dates of the window ending at `selected`, newest first.
pub fn window_dates(dates: &[NaiveDate], selected: usize, size: usize) -> &[NaiveDate] {
    let start = selected.min(dates.len());
    let end = start.saturating_add(size).min(dates.len());
    &dates[start..end]
}

/// One point per window day, in window order.
pub fn ticker_history(window: &[DailySnapshot], ticker: &str, market: Market) -> Vec<HistoryPoint> {
    window
        .iter()
        .map(|day| {
            let found = day.find(market, ticker);
            HistoryPoint {
                date: day.date,
                rank: found.map(|s| s.rank),
                trading_value: found.map(|s| s.trading_value),
                close: found.map(|s| s.close),
                change_pct: found.map(|s| s.change_pct),
            }
        })
        .collect()
}

/// Ranked on the newest day but not on the day before. Needs two days.
pub fn is_new_entry(window: &[DailySnapshot], ticker: &str, market: Market) -> bool {
    match window {
        [today, yesterday, ..] => {
            today.contains(market, ticker) && !yesterday.contains(market, ticker)
        }
        _ => false,
    }
}

pub fn streak_count(window: &[DailySnapshot], ticker: &str, market: Market) -> Streak {
    let count = window
        .iter()
        .filter(|day| day.contains(market, ticker))
        .count();
    Streak {
        count,
        total: window.len(),
    }
}
