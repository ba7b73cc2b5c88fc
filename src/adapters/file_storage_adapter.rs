//! File-backed key-value storage adapter.
//!
//! Each key is one `<key>.json` file under the base directory. Writes go to
//! a temp file first and are renamed into place, so an interrupted write
//! never leaves a truncated blob behind.

use crate::domain::error::KrxError;
use crate::ports::storage_port::StoragePort;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileStorageAdapter {
    base_path: PathBuf,
}

impl FileStorageAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl StoragePort for FileStorageAdapter {
    fn get(&self, key: &str) -> Result<Option<String>, KrxError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| KrxError::Storage {
                reason: format!("failed to read {}: {}", path.display(), e),
            })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KrxError> {
        fs::create_dir_all(&self.base_path).map_err(|e| KrxError::Storage {
            reason: format!(
                "failed to create directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let dest = self.key_path(key);
        let tmp_dest = dest.with_extension("json.tmp");

        let result = (|| -> std::io::Result<()> {
            fs::write(&tmp_dest, value)?;
            fs::rename(&tmp_dest, &dest)?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_dest);
            return Err(KrxError::Storage {
                reason: format!("failed to write {}: {}", dest.display(), e),
            });
        }
        Ok(())
    }
}
