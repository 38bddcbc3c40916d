//! Campaign registration configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Downstream campaign registry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    /// Endpoint receiving completed briefs; registration is off when unset
    pub url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl RegistrationConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured endpoint, if any
    pub fn endpoint(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    /// Validate registration configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = self.endpoint() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidRegistrationUrl);
            }
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
