//! Port traits for the collaborators the viewer core depends on.

pub mod config_port;
pub mod data_port;
pub mod storage_port;
