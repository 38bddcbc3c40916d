//! HTTP implementation of CampaignRegistry.
//!
//! Sends `{data, idCampaing?}` as JSON to a single configured endpoint.
//! Any 2xx status counts as accepted.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::ports::{CampaignRegistration, CampaignRegistry, RegistrationError};

/// Campaign registry reached over HTTP.
pub struct HttpCampaignRegistry {
    url: String,
    client: Client,
}

impl HttpCampaignRegistry {
    /// Creates a registry client for `url`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RegistrationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistrationError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CampaignRegistry for HttpCampaignRegistry {
    async fn register(&self, registration: CampaignRegistration) -> Result<(), RegistrationError> {
        tracing::debug!(
            url = %self.url,
            fields = registration.data.len(),
            campaign_id = ?registration.campaign_id,
            "Registering campaign"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&registration)
            .send()
            .await
            .map_err(|e| RegistrationError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(RegistrationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
