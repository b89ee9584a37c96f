//! Port traits: the seams between domain logic and I/O.

pub mod config_port;
pub mod group_store;
pub mod history_store;
pub mod price_provider;
pub mod symbol_resolver;
