//! HTTP routes for the chat endpoint.

use axum::{routing::post, Router};

use super::handlers::{chat, BriefHandlers};

/// Creates the chat router.
pub fn brief_routes(handlers: BriefHandlers) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .with_state(handlers)
}
