#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use krxrank::domain::error::KrxError;
pub use krxrank::domain::market::{DailySnapshot, Market, StockEntry};
use krxrank::ports::data_port::DataPort;
use std::cell::Cell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub dates: Vec<NaiveDate>,
    pub snapshots: HashMap<NaiveDate, DailySnapshot>,
    pub latest: Option<DailySnapshot>,
    pub index_error: Option<String>,
    pub loads: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            dates: Vec::new(),
            snapshots: HashMap::new(),
            latest: None,
            index_error: None,
            loads: Cell::new(0),
        }
    }

    /// Adds a snapshot and indexes its date, keeping the index newest first.
    pub fn with_snapshot(mut self, snapshot: DailySnapshot) -> Self {
        self.index_date(snapshot.date);
        self.snapshots.insert(snapshot.date, snapshot);
        self
    }

    /// Indexes a date whose snapshot cannot be loaded.
    pub fn with_missing_day(mut self, date: &str) -> Self {
        self.index_date(parse_date(date));
        self
    }

    pub fn with_latest(mut self, snapshot: DailySnapshot) -> Self {
        self.latest = Some(snapshot);
        self
    }

    pub fn with_index_error(mut self, reason: &str) -> Self {
        self.index_error = Some(reason.to_string());
        self
    }

    fn index_date(&mut self, date: NaiveDate) {
        if !self.dates.contains(&date) {
            self.dates.push(date);
            self.dates.sort_by(|a, b| b.cmp(a));
        }
    }
}

impl DataPort for MockDataPort {
    fn date_index(&self) -> Result<Vec<NaiveDate>, KrxError> {
        if let Some(reason) = &self.index_error {
            return Err(KrxError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.dates.clone())
    }

    fn snapshot(&self, date: NaiveDate) -> Option<DailySnapshot> {
        self.loads.set(self.loads.get() + 1);
        self.snapshots.get(&date).cloned()
    }

    fn latest(&self) -> Option<DailySnapshot> {
        self.latest.clone()
    }
}

pub fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 11, 9, 0, 0).unwrap()
}

pub fn make_entry(rank: u32, ticker: &str, name: &str) -> StockEntry {
    StockEntry {
        rank,
        ticker: ticker.to_string(),
        name: name.to_string(),
        close: 10_000.0 * rank as f64,
        open: None,
        high: None,
        low: None,
        volume: 1_000_000 / rank as u64,
        trading_value: 1e12 / rank as f64,
        change_pct: 0.0,
    }
}

pub fn with_change(mut entry: StockEntry, change_pct: f64) -> StockEntry {
    entry.change_pct = change_pct;
    entry
}

/// Snapshot whose KOSPI list is `tickers` ranked in order.
pub fn kospi_day(date: &str, tickers: &[&str]) -> DailySnapshot {
    make_snapshot(date, tickers, &[])
}

pub fn make_snapshot(date: &str, kospi: &[&str], kosdaq: &[&str]) -> DailySnapshot {
    let rank = |list: &[&str]| -> Vec<StockEntry> {
        list.iter()
            .enumerate()
            .map(|(i, t)| make_entry(i as u32 + 1, t, &format!("{t} Corp")))
            .collect()
    };
    DailySnapshot {
        date: parse_date(date),
        updated_at: Some(format!("{date}T16:05:00")),
        kospi: rank(kospi),
        kosdaq: rank(kosdaq),
    }
}
