//! Key-value text persistence port trait.

use crate::domain::error::KrxError;

/// Synchronous string store surviving process restarts.
///
/// `set` must replace the whole value atomically: a reader never observes
/// a partially written blob.
pub trait StoragePort {
    fn get(&self, key: &str) -> Result<Option<String>, KrxError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KrxError>;
}
