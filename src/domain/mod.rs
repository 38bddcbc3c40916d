//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `brief` - The campaign brief schema, data record and merge rules
//! - `session` - The conversation session aggregate and its turns

pub mod brief;
pub mod foundation;
pub mod session;
