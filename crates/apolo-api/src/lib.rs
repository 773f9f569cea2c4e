//! API layer for the Apolo action engine
//!
//! HTTP handlers for storing accounts and action lists, executing the lists
//! against accounts and inspecting the resulting account state.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

// Re-export DTOs (common types)
pub use dto::ApiResponse;

pub use handlers::{configure, configure_accounts, configure_actions, health_check};
