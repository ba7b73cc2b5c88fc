//! Viewer configuration and its validation.
//!
//! Every key is optional; missing keys fall back to the defaults below.

use crate::domain::annotation::DEFAULT_STORAGE_KEY;
use crate::domain::error::KrxError;
use crate::domain::history::DEFAULT_WINDOW;
use crate::domain::market::Market;
use crate::ports::config_port::ConfigPort;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MEMO_DIR: &str = ".krxrank";
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

/// Largest accepted history window.
pub const MAX_WINDOW: i64 = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub data_dir: PathBuf,
    pub window: usize,
    pub cache_capacity: usize,
    pub memo_dir: PathBuf,
    pub memo_key: String,
    pub market: Market,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            window: DEFAULT_WINDOW,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            memo_dir: PathBuf::from(DEFAULT_MEMO_DIR),
            memo_key: DEFAULT_STORAGE_KEY.to_string(),
            market: Market::default(),
        }
    }
}

pub fn validate_viewer_config(config: &dyn ConfigPort) -> Result<(), KrxError> {
    validate_window(config)?;
    validate_cache_capacity(config)?;
    validate_memo_key(config)?;
    validate_market(config)?;
    Ok(())
}

/// Validates and then reads every key, applying defaults.
pub fn build_viewer_config(config: &dyn ConfigPort) -> Result<ViewerConfig, KrxError> {
    validate_viewer_config(config)?;
    let defaults = ViewerConfig::default();
    let market = match config.get_string("view", "market") {
        Some(m) => m.parse()?,
        None => defaults.market,
    };
    Ok(ViewerConfig {
        data_dir: PathBuf::from(config.get_string_or("data", "dir", DEFAULT_DATA_DIR)),
        window: config.get_int("data", "window", DEFAULT_WINDOW as i64) as usize,
        cache_capacity: config.get_int("data", "cache_capacity", DEFAULT_CACHE_CAPACITY as i64)
            as usize,
        memo_dir: PathBuf::from(config.get_string_or("memo", "dir", DEFAULT_MEMO_DIR)),
        memo_key: config.get_string_or("memo", "key", DEFAULT_STORAGE_KEY),
        market,
    })
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), KrxError> {
    let value = config.get_int("data", "window", DEFAULT_WINDOW as i64);
    if !(1..=MAX_WINDOW).contains(&value) {
        return Err(KrxError::ConfigInvalid {
            section: "data".to_string(),
            key: "window".to_string(),
            reason: format!("window must be between 1 and {MAX_WINDOW}"),
        });
    }
    Ok(())
}

fn validate_cache_capacity(config: &dyn ConfigPort) -> Result<(), KrxError> {
    let value = config.get_int("data", "cache_capacity", DEFAULT_CACHE_CAPACITY as i64);
    if value < 1 {
        return Err(KrxError::ConfigInvalid {
            section: "data".to_string(),
            key: "cache_capacity".to_string(),
            reason: "cache_capacity must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_memo_key(config: &dyn ConfigPort) -> Result<(), KrxError> {
    let Some(key) = config.get_string("memo", "key") else {
        return Ok(());
    };
    let valid = !key.trim().is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !valid || key.starts_with('.') {
        return Err(KrxError::ConfigInvalid {
            section: "memo".to_string(),
            key: "key".to_string(),
            reason: "key may only contain letters, digits, '-', '_' and '.'".to_string(),
        });
    }
    Ok(())
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), KrxError> {
    match config.get_string("view", "market") {
        Some(m) if m.parse::<Market>().is_err() => Err(KrxError::ConfigInvalid {
            section: "view".to_string(),
            key: "market".to_string(),
            reason: format!("unknown market '{m}', expected kospi or kosdaq"),
        }),
        _ => Ok(()),
    }
}
