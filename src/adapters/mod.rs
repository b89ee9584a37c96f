//! Concrete adapter implementations for ports.

pub mod csv_provider;
pub mod file_config_adapter;
pub mod json_file_store;
pub mod json_group_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod ticker_resolver;
pub mod yahoo_provider;
