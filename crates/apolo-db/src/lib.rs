//! Apolo Actions Storage Layer
//!
//! This crate provides the storage collaborators of the action engine:
//!
//! - Connection pool management with sqlx
//! - PostgreSQL-backed CDR storage
//! - An in-process data store for accounts, actions, action plans and
//!   destinations

pub mod memory;
pub mod pool;
pub mod repositories;

pub use memory::MemoryDataStore;
pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use apolo_core::{AppError, AppResult};
pub use sqlx::PgPool;
