//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod file_storage_adapter;
pub mod json_data_adapter;
pub mod memory_storage_adapter;
pub mod text_table;
