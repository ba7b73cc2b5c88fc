//! Daily ranking snapshot types.

use crate::domain::error::KrxError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two independently ranked KRX boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    #[default]
    Kospi,
    Kosdaq,
}

impl Market {
    pub fn key(&self) -> &'static str {
        match self {
            Market::Kospi => "kospi",
            Market::Kosdaq => "kosdaq",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Market::Kospi => "코스피",
            Market::Kosdaq => "코스닥",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Market {
    type Err = KrxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kospi" => Ok(Market::Kospi),
            "kosdaq" => Ok(Market::Kosdaq),
            other => Err(KrxError::UnknownMarket(other.to_string())),
        }
    }
}

/// One ranked row of a daily snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockEntry {
    pub rank: u32,
    pub ticker: String,
    pub name: String,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    pub volume: u64,
    pub trading_value: f64,
    #[serde(default)]
    pub change_pct: f64,
}

/// Full ranked listing for both markets on one trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub kospi: Vec<StockEntry>,
    #[serde(default)]
    pub kosdaq: Vec<StockEntry>,
}

impl DailySnapshot {
    pub fn entries(&self, market: Market) -> &[StockEntry] {
        match market {
            Market::Kospi => &self.kospi,
            Market::Kosdaq => &self.kosdaq,
        }
    }

    pub fn find(&self, market: Market, ticker: &str) -> Option<&StockEntry> {
        self.entries(market).iter().find(|s| s.ticker == ticker)
    }

    pub fn contains(&self, market: Market, ticker: &str) -> bool {
        self.find(market, ticker).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.kospi.is_empty() && self.kosdaq.is_empty()
    }
}

/// Ordered list of available trading days, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateIndex {
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
}

impl DateIndex {
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.iter().position(|d| *d == date)
    }
}
