//! Foundation module - Shared domain primitives.
//!
//! Identifiers, timestamps, the state machine trait and validation errors
//! that the brief and session modules build on.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::ValidationError;
pub use ids::{SessionId, TraceId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
