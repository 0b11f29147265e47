//! CLI command implementations

pub mod auto_update;
pub mod config;
pub mod notifications;
