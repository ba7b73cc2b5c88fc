//! In-process key-value storage adapter.
//!
//! Backs the annotation store for tests and for runs that must not touch
//! disk. Contents live as long as the adapter.

use crate::domain::error::KrxError;
use crate::ports::storage_port::StoragePort;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorageAdapter {
    values: HashMap<String, String>,
}

impl MemoryStorageAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl StoragePort for MemoryStorageAdapter {
    fn get(&self, key: &str) -> Result<Option<String>, KrxError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KrxError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
