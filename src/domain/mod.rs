//! Core domain types and logic.

pub mod market;
pub mod format;
pub mod annotation;
pub mod history;
pub mod table;
pub mod config_validation;
pub mod error;
