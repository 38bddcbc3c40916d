//! HTTP handlers for the chat endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{ProcessTurnCommand, ProcessTurnError, ProcessTurnHandler};

use super::dto::{ChatRequest, ChatResponse, ErrorResponse};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct BriefHandlers {
    process_turn: Arc<ProcessTurnHandler>,
}

impl BriefHandlers {
    pub fn new(process_turn: Arc<ProcessTurnHandler>) -> Self {
        Self { process_turn }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /api/chat - Process one turn of the brief conversation
pub async fn chat(
    State(handlers): State<BriefHandlers>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(rejection.body_text())),
            )
                .into_response()
        }
    };

    let cmd: ProcessTurnCommand = req.into();

    match handlers.process_turn.handle(cmd).await {
        // The registration handle is dropped; the task keeps running detached.
        Ok(result) => (StatusCode::OK, Json(ChatResponse::from(result))).into_response(),
        Err(e) => handle_turn_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn handle_turn_error(error: ProcessTurnError) -> Response {
    match error {
        ProcessTurnError::Validation(e) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))).into_response()
        }
        ProcessTurnError::ModelUnavailable => {
            tracing::error!("Chat turn failed: model returned no candidates");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("No response from the model")),
            )
                .into_response()
        }
        other => {
            tracing::error!(error = %other, "Chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Internal server error")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ValidationError;
    use crate::ports::{AIError, SessionStoreError};

    #[test]
    fn validation_error_maps_to_400() {
        let error = ProcessTurnError::Validation(ValidationError::empty_field("sessionID"));
        let response = handle_turn_error(error);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn model_unavailable_maps_to_500() {
        let response = handle_turn_error(ProcessTurnError::ModelUnavailable);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn infrastructure_errors_map_to_500() {
        let model = handle_turn_error(ProcessTurnError::Model(AIError::AuthenticationFailed));
        let store = handle_turn_error(ProcessTurnError::Store(SessionStoreError::DatabaseError(
            "down".into(),
        )));

        assert_eq!(model.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
