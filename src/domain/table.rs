//! Ranking table engine.
//!
//! Turns one market's ranked list into display rows: search filter, stable
//! column sort, NEW/streak badges from the history window, annotations, and
//! the detail block of the single expanded row. Sort order and expansion are
//! held in an explicit [`ViewState`] that the caller owns and resets when the
//! active market or date changes. Rendering is a pure function of its inputs.

use crate::domain::annotation::{Annotation, AnnotationTable};
use crate::domain::error::KrxError;
use crate::domain::format::{
    format_change_pct, format_price, format_trading_value, format_value_compact, format_volume,
    ChangeClass,
};
use crate::domain::history::{is_new_entry, streak_count, ticker_history, HistoryPoint, Streak};
use crate::domain::market::{DailySnapshot, Market, StockEntry};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

/// Table columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Rank,
    Name,
    Close,
    ChangePct,
    Volume,
    TradingValue,
    Tags,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Rank,
        Column::Name,
        Column::Close,
        Column::ChangePct,
        Column::Volume,
        Column::TradingValue,
        Column::Tags,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Column::Rank => "rank",
            Column::Name => "name",
            Column::Close => "close",
            Column::ChangePct => "change_pct",
            Column::Volume => "volume",
            Column::TradingValue => "trading_value",
            Column::Tags => "tags",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Column::Rank => "#",
            Column::Name => "종목명",
            Column::Close => "종가",
            Column::ChangePct => "등락률",
            Column::Volume => "거래량",
            Column::TradingValue => "거래대금",
            Column::Tags => "메모/태그",
        }
    }

    pub fn is_sortable(&self) -> bool {
        !matches!(self, Column::Tags)
    }

    /// Direction applied when the column is freshly selected.
    pub fn default_ascending(&self) -> bool {
        matches!(self, Column::Name)
    }
}

impl FromStr for Column {
    type Err = KrxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Column::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .ok_or(KrxError::UnknownColumn(key))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: Column,
    pub ascending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            column: Column::Rank,
            ascending: true,
        }
    }
}

impl SortSpec {
    pub fn arrow(&self) -> &'static str {
        if self.ascending { "▲" } else { "▼" }
    }
}

/// Transient per-view UI state: current sort and the expanded ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    sort: SortSpec,
    expanded: Option<String>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    pub fn is_expanded(&self, ticker: &str) -> bool {
        self.expanded.as_deref() == Some(ticker)
    }

    /// Header click. Same column flips direction, a new column starts at its
    /// default direction, the tags column is ignored. Returns whether the
    /// sort changed.
    pub fn toggle_sort(&mut self, column: Column) -> bool {
        if !column.is_sortable() {
            return false;
        }
        if self.sort.column == column {
            self.sort.ascending = !self.sort.ascending;
        } else {
            self.sort = SortSpec {
                column,
                ascending: column.default_ascending(),
            };
        }
        true
    }

    /// Row click. Expands `ticker` (collapsing any other row) or collapses
    /// it if it was already open. Returns whether `ticker` is now expanded.
    pub fn toggle_expand(&mut self, ticker: &str) -> bool {
        if self.is_expanded(ticker) {
            self.expanded = None;
            false
        } else {
            self.expanded = Some(ticker.to_string());
            true
        }
    }

    /// Back to rank ascending with nothing expanded. Call on market or date change.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn header(&self) -> Vec<HeaderCell> {
        Column::ALL
            .into_iter()
            .map(|column| HeaderCell {
                column,
                label: column.label(),
                sortable: column.is_sortable(),
                ascending: (self.sort.column == column).then_some(self.sort.ascending),
            })
            .collect()
    }

    pub fn render(
        &self,
        request: &RenderRequest<'_>,
        annotations: &AnnotationTable,
        now: DateTime<Utc>,
    ) -> TableView {
        let header = self.header();
        if request.stocks.is_empty() {
            return TableView {
                header,
                rows: Vec::new(),
                no_data: true,
            };
        }

        let mut entries = filter_entries(request.stocks, request.query, annotations);
        sort_entries(&mut entries, self.sort);

        let rows = entries
            .into_iter()
            .map(|entry| self.build_row(entry, request, annotations, now))
            .collect();

        TableView {
            header,
            rows,
            no_data: false,
        }
    }

    fn build_row(
        &self,
        entry: &StockEntry,
        request: &RenderRequest<'_>,
        annotations: &AnnotationTable,
        now: DateTime<Utc>,
    ) -> DisplayRow {
        let annotation = annotations.get(&entry.ticker);
        let expanded = self.is_expanded(&entry.ticker).then(|| ExpandedDetail {
            history: ticker_history(request.window, &entry.ticker, request.market)
                .into_iter()
                .map(HistoryRow::from)
                .collect(),
            tags: annotation.tags.clone(),
            note: annotation.note.clone(),
        });

        DisplayRow {
            cells: RowCells::from(entry),
            change_class: ChangeClass::of(entry.change_pct),
            is_new: is_new_entry(request.window, &entry.ticker, request.market),
            streak: streak_count(request.window, &entry.ticker, request.market),
            recently_updated: annotation.is_recently_updated_at(now),
            annotation,
            expanded,
            entry: entry.clone(),
        }
    }
}

/// Inputs of one render pass.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub stocks: &'a [StockEntry],
    pub market: Market,
    /// Trailing snapshots, newest first, used for badges and history.
    pub window: &'a [DailySnapshot],
    pub query: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub column: Column,
    pub label: &'static str,
    pub sortable: bool,
    /// `Some(ascending)` on the active sort column.
    pub ascending: Option<bool>,
}

impl HeaderCell {
    pub fn indicator(&self) -> &'static str {
        match self.ascending {
            Some(true) => " ▲",
            Some(false) => " ▼",
            None => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowCells {
    pub rank: String,
    pub price: String,
    pub change_pct: String,
    pub volume: String,
    pub trading_value: String,
}

impl From<&StockEntry> for RowCells {
    fn from(entry: &StockEntry) -> Self {
        Self {
            rank: entry.rank.to_string(),
            price: format_price(entry.close),
            change_pct: format_change_pct(entry.change_pct),
            volume: format_volume(entry.volume as f64),
            trading_value: format_trading_value(entry.trading_value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    New,
    Streak(Streak),
}

impl Badge {
    pub fn text(&self) -> String {
        match self {
            Badge::New => "NEW".to_string(),
            Badge::Streak(streak) => streak.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub entry: StockEntry,
    pub cells: RowCells,
    pub change_class: ChangeClass,
    pub is_new: bool,
    pub streak: Streak,
    pub annotation: Annotation,
    pub recently_updated: bool,
    /// Present only on the expanded row.
    pub expanded: Option<ExpandedDetail>,
}

impl DisplayRow {
    pub fn ticker(&self) -> &str {
        &self.entry.ticker
    }

    pub fn badges(&self) -> Vec<Badge> {
        let mut badges = Vec::new();
        if self.is_new {
            badges.push(Badge::New);
        }
        if self.streak.shows_badge() {
            badges.push(Badge::Streak(self.streak));
        }
        badges
    }
}

/// Detail block under the expanded row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedDetail {
    pub history: Vec<HistoryRow>,
    pub tags: Vec<String>,
    pub note: String,
}

/// History mini-table row; absent days show `-`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub point: HistoryPoint,
    pub date_label: String,
    pub rank: String,
    pub trading_value: String,
    pub close: String,
    pub change_pct: String,
    /// Only set for non-zero changes.
    pub change_class: Option<ChangeClass>,
}

impl From<HistoryPoint> for HistoryRow {
    fn from(point: HistoryPoint) -> Self {
        let dash = || "-".to_string();
        Self {
            date_label: point.date.format("%m-%d").to_string(),
            rank: point.rank.map(|r| r.to_string()).unwrap_or_else(dash),
            trading_value: point
                .trading_value
                .map(format_value_compact)
                .unwrap_or_else(dash),
            close: point.close.map(format_price).unwrap_or_else(dash),
            change_pct: point.change_pct.map(format_change_pct).unwrap_or_else(dash),
            change_class: point
                .change_pct
                .map(ChangeClass::of)
                .filter(|c| *c != ChangeClass::Flat),
            point,
        }
    }
}

/// Declarative table: header cells plus rows in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub header: Vec<HeaderCell>,
    pub rows: Vec<DisplayRow>,
    /// The market had no entries at all, as opposed to a search hiding them.
    pub no_data: bool,
}

impl TableView {
    pub fn tickers(&self) -> Vec<&str> {
        self.rows.iter().map(DisplayRow::ticker).collect()
    }

    pub fn expanded_row(&self) -> Option<&DisplayRow> {
        self.rows.iter().find(|r| r.expanded.is_some())
    }
}

/// Case-insensitive name match, case-sensitive ticker substring, or a
/// case-insensitive tag match.
pub fn matches_query(entry: &StockEntry, query: &str, annotation: Option<&Annotation>) -> bool {
    if query.is_empty() {
        return true;
    }
    let q = query.to_lowercase();
    entry.name.to_lowercase().contains(&q)
        || entry.ticker.contains(query)
        || annotation.is_some_and(|a| a.tags.iter().any(|t| t.to_lowercase().contains(&q)))
}

pub fn filter_entries<'a>(
    stocks: &'a [StockEntry],
    query: &str,
    annotations: &AnnotationTable,
) -> Vec<&'a StockEntry> {
    stocks
        .iter()
        .filter(|s| matches_query(s, query, annotations.lookup(&s.ticker)))
        .collect()
}

fn compare_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn compare_by(a: &StockEntry, b: &StockEntry, column: Column) -> Ordering {
    match column {
        Column::Rank => a.rank.cmp(&b.rank),
        Column::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        Column::Close => compare_f64(a.close, b.close),
        Column::ChangePct => compare_f64(a.change_pct, b.change_pct),
        Column::Volume => a.volume.cmp(&b.volume),
        Column::TradingValue => compare_f64(a.trading_value, b.trading_value),
        Column::Tags => Ordering::Equal,
    }
}

/// Stable sort; equal keys keep their incoming order in both directions.
pub fn sort_entries(entries: &mut [&StockEntry], spec: SortSpec) {
    if !spec.column.is_sortable() {
        return;
    }
    entries.sort_by(|a, b| {
        let ord = compare_by(a, b, spec.column);
        if spec.ascending { ord } else { ord.reverse() }
    });
}
