//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod brief;

pub use brief::{
    PersistenceBridge, ProcessTurnCommand, ProcessTurnError, ProcessTurnHandler,
    ProcessTurnResult, ReplyKind, EXTRACTION_FAILED_WARNING,
};
