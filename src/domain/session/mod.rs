//! Session module - the durable conversation record.

mod aggregate;
mod turn;

pub use aggregate::Session;
pub use turn::{FunctionCall, FunctionResponse, Part, Role, Turn};
