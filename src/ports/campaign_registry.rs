//! Campaign registry port.
//!
//! The downstream system that owns campaign records. A completed brief is
//! handed over once, without the completion flag.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Payload accepted by the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRegistration {
    /// Brief fields, completion flag removed.
    pub data: Map<String, Value>,
    /// Existing campaign to update; absent to create a new one.
    #[serde(rename = "idCampaing", skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

/// Errors from the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("registry rejected registration with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),
}

/// Port for registering completed briefs downstream.
#[async_trait]
pub trait CampaignRegistry: Send + Sync {
    /// Register or update the campaign record.
    async fn register(&self, registration: CampaignRegistration) -> Result<(), RegistrationError>;
}
