//! Action execution engine
//!
//! Applies ordered, weighted action lists to accounts:
//!
//! - `registry` maps action type tags to handlers
//! - `handlers` holds one handler per action type
//! - `executor` sorts a list and drives the handlers in order
//! - `field` and `template` derive values from live account/action state
//! - `poster`, `mailer` and `rpc` deliver notifications and remote calls
//!
//! Handler errors abort the rest of the list; effects of the actions that
//! already ran are kept.

pub mod context;
pub mod executor;
pub mod field;
pub mod handlers;
pub mod mailer;
pub mod poster;
pub mod publisher;
pub mod registry;
pub mod rpc;
pub mod template;

pub use context::EngineContext;
pub use executor::{ActionExecutor, ExecutionOutcome};
pub use registry::{ActionHandler, ActionRegistry};
