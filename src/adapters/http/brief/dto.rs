//! Request and response bodies for the chat endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::{ProcessTurnCommand, ProcessTurnResult, ReplyKind};
use crate::domain::brief::BriefField;

// ════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(rename = "sessionID", default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_message: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub campaign_id: Option<String>,
}

impl From<ChatRequest> for ProcessTurnCommand {
    fn from(req: ChatRequest) -> Self {
        Self {
            session_id: req.session_id,
            user_message: req.user_message,
            user_id: req.user_id,
            campaign_id: req.campaign_id,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════

/// Reply to a processed turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    pub text: String,
    pub collected_data: Map<String, Value>,
    pub missing_fields: Vec<BriefField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<ProcessTurnResult> for ChatResponse {
    fn from(result: ProcessTurnResult) -> Self {
        let success = match result.kind {
            ReplyKind::DataCollected | ReplyKind::Completed => Some(true),
            ReplyKind::Message => None,
        };

        Self {
            kind: result.kind,
            text: result.text,
            collected_data: result.collected_data,
            missing_fields: result.missing_fields,
            success,
            warning: result.warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
