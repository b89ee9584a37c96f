//! Core domain types and logic.

pub mod align;
pub mod basket;
pub mod comparison;
pub mod composite;
pub mod config_validation;
pub mod error;
pub mod history_cache;
pub mod price;
pub mod range;
pub mod summary;
pub mod yoy;
