//! Application layer - Handlers and the services they coordinate.
//!
//! This layer sequences domain operations and coordinates between ports:
//! the turn handler drives the model through the gateway, under the backoff
//! executor, and hands the result to the persistence bridge.

pub mod backoff;
pub mod handlers;
pub mod model_gateway;

pub use backoff::{is_rate_limited, BackoffExecutor, RetryPolicy};
pub use handlers::{
    PersistenceBridge, ProcessTurnCommand, ProcessTurnError, ProcessTurnHandler,
    ProcessTurnResult, ReplyKind, EXTRACTION_FAILED_WARNING,
};
pub use model_gateway::{extraction_declaration, ExtractionResult, ModelGateway, EXTRACTION_FUNCTION};
