//! Shared domain types.

pub mod auth;
pub mod user;
