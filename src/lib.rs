//! krxrank: daily KRX trading-value ranking viewer.
//!
//! Hexagonal architecture: table, history and annotation logic in [`domain`],
//! collaborator traits in [`ports`], concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
