//! Static JSON snapshot directory adapter.
//!
//! Layout written by the daily collector:
//!
//! ```text
//! <base>/index.json            {"dates": ["2025-02-11", ...]}  newest first
//! <base>/latest.json           most recent snapshot
//! <base>/daily/<date>.json     one snapshot per trading day
//! ```
//!
//! Loaded snapshots are memoized in a bounded cache; the oldest insertion is
//! evicted once `capacity` is reached. Failed loads are not cached.

use crate::domain::error::KrxError;
use crate::domain::market::{DailySnapshot, DateIndex};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SnapshotKey {
    Daily(NaiveDate),
    Latest,
}

#[derive(Debug)]
struct SnapshotCache {
    capacity: usize,
    order: VecDeque<SnapshotKey>,
    entries: HashMap<SnapshotKey, DailySnapshot>,
}

impl SnapshotCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    fn get(&self, key: SnapshotKey) -> Option<DailySnapshot> {
        self.entries.get(&key).cloned()
    }

    fn insert(&mut self, key: SnapshotKey, snapshot: DailySnapshot) {
        if self.entries.insert(key, snapshot).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct JsonDataAdapter {
    base_path: PathBuf,
    index: RefCell<Option<Vec<NaiveDate>>>,
    cache: RefCell<SnapshotCache>,
}

impl JsonDataAdapter {
    pub fn new(base_path: PathBuf, cache_capacity: usize) -> Self {
        Self {
            base_path,
            index: RefCell::new(None),
            cache: RefCell::new(SnapshotCache::new(cache_capacity)),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn index_path(&self) -> PathBuf {
        self.base_path.join("index.json")
    }

    fn latest_path(&self) -> PathBuf {
        self.base_path.join("latest.json")
    }

    fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.base_path
            .join("daily")
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Number of snapshots currently memoized.
    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Forget the date index and every cached snapshot.
    pub fn clear_cache(&self) {
        self.index.borrow_mut().take();
        self.cache.borrow_mut().clear();
    }

    fn load_snapshot(&self, key: SnapshotKey) -> Option<DailySnapshot> {
        if let Some(hit) = self.cache.borrow().get(key) {
            return Some(hit);
        }

        let path = match key {
            SnapshotKey::Daily(date) => self.daily_path(date),
            SnapshotKey::Latest => self.latest_path(),
        };
        if !path.exists() {
            return None;
        }

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", path.display(), e);
                return None;
            }
        };
        let snapshot: DailySnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("warning: skipping {} ({})", path.display(), e);
                return None;
            }
        };

        self.cache.borrow_mut().insert(key, snapshot.clone());
        Some(snapshot)
    }
}

impl DataPort for JsonDataAdapter {
    fn date_index(&self) -> Result<Vec<NaiveDate>, KrxError> {
        if let Some(dates) = self.index.borrow().as_ref() {
            return Ok(dates.clone());
        }

        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).map_err(|e| KrxError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let index: DateIndex =
            serde_json::from_str(&content).map_err(|e| KrxError::DataSource {
                reason: format!("invalid date index {}: {}", path.display(), e),
            })?;

        *self.index.borrow_mut() = Some(index.dates.clone());
        Ok(index.dates)
    }

    fn snapshot(&self, date: NaiveDate) -> Option<DailySnapshot> {
        self.load_snapshot(SnapshotKey::Daily(date))
    }

    fn latest(&self) -> Option<DailySnapshot> {
        self.load_snapshot(SnapshotKey::Latest)
    }
}
