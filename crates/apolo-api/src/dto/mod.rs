//! Data Transfer Objects (DTOs) for API requests and responses

pub mod accounts;
pub mod actions;
pub mod common;

pub use accounts::*;
pub use actions::*;
pub use common::*;
