//! Domain models for the action engine
//!
//! This module contains the core domain models used throughout the application.

pub mod account;
pub mod action;
pub mod action_plan;
pub mod action_trigger;
pub mod balance;
pub mod cdr;
pub mod destination;
pub mod event;
pub mod stats_queue;

pub use account::{account_key, Account};
pub use action::{Action, ActionType, Actions};
pub use action_plan::{ActionPlan, ActionTiming};
pub use action_trigger::{ActionTrigger, UnitCounter};
pub use balance::{balance_types, join_set, Balance, BalanceFilter, StringSet, DEFAULT_BALANCE_ID};
pub use cdr::Cdr;
pub use destination::Destination;
pub use event::ThresholdEvent;
pub use stats_queue::StatsQueueTriggered;
