//! Apolo Actions Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the action execution engine. It includes:
//!
//! - Domain models (Account, Balance, Action, CDR, etc.)
//! - Collaborator traits for stores, caches, locks and publishers
//! - Unified error handling with HTTP response mapping
//! - Application configuration
//! - Nested-path lookup over JSON values

pub mod config;
pub mod error;
pub mod models;
pub mod navigable;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
