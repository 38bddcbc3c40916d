//! Brief extraction command handlers.

mod persistence;
mod process_turn;

pub use persistence::PersistenceBridge;
pub use process_turn::{
    ProcessTurnCommand, ProcessTurnError, ProcessTurnHandler, ProcessTurnResult, ReplyKind,
    EXTRACTION_FAILED_WARNING,
};
