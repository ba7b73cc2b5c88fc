//! Daily snapshot access port trait.

use crate::domain::error::KrxError;
use crate::domain::market::DailySnapshot;
use chrono::NaiveDate;

pub trait DataPort {
    /// Available trading days, newest first. An absent index is empty.
    fn date_index(&self) -> Result<Vec<NaiveDate>, KrxError>;

    /// Snapshot for `date`, or `None` when it cannot be loaded.
    fn snapshot(&self, date: NaiveDate) -> Option<DailySnapshot>;

    /// Most recently collected snapshot, if any.
    fn latest(&self) -> Option<DailySnapshot>;

    /// Snapshots for the first `max_count` of `dates`, in the same order.
    /// Days that fail to load are skipped.
    fn window(&self, dates: &[NaiveDate], max_count: usize) -> Vec<DailySnapshot> {
        dates
            .iter()
            .take(max_count)
            .filter_map(|d| self.snapshot(*d))
            .collect()
    }
}
