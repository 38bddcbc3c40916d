//! HTTP adapter for the brief conversation endpoint.

mod dto;
mod handlers;
mod routes;

pub use dto::{ChatRequest, ChatResponse, ErrorResponse};
pub use handlers::BriefHandlers;
pub use routes::brief_routes;
