//! Service configuration.
//!
//! Everything is read from `BRIEF_AGENT__<SECTION>__<KEY>` environment
//! variables (a `.env` file is honoured in development) through the `config`
//! crate, then checked section by section with [`AppConfig::validate`].
//!
//! ```no_run
//! use brief_agent::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod ai;
mod error;
mod registration;
mod retry;
mod server;
mod store;

pub use ai::AiConfig;
pub use error::{ConfigError, ValidationError};
pub use registration::RegistrationConfig;
pub use retry::RetryConfig;
pub use server::{Environment, LogFormat, ServerConfig};
pub use store::{StoreBackend, StoreConfig};

use serde::Deserialize;

/// All configuration sections. Every section has defaults, so loading only
/// fails on malformed values; missing required keys surface in `validate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Gemini credentials and sampling
    #[serde(default)]
    pub ai: AiConfig,

    /// Backoff for rate-limited model calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// PostgreSQL or in-memory session storage
    #[serde(default)]
    pub store: StoreConfig,

    /// Downstream campaign registration
    #[serde(default)]
    pub registration: RegistrationConfig,
}

impl AppConfig {
    /// Reads the environment, e.g. `BRIEF_AGENT__SERVER__PORT=8080` sets
    /// `server.port` and `BRIEF_AGENT__STORE__BACKEND=memory` selects the
    /// in-memory store.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BRIEF_AGENT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks every section, stopping at the first invalid one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.ai.validate()?;
        self.retry.validate()?;
        self.store.validate()?;
        self.registration.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
