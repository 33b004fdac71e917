//! # tradedesk-core
//!
//! Core crate for the TradeDesk client agent. Contains configuration
//! schemas, shared domain types (user classification, credentials),
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other TradeDesk crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
