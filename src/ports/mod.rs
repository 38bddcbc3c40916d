//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - Generative model that can be forced to call a function
//! - `SessionStore` - Durable keyed storage of conversation sessions
//! - `CampaignRegistry` - Downstream owner of campaign records

mod ai_provider;
mod campaign_registry;
mod session_store;

pub use ai_provider::{
    AIError, AIProvider, Candidate, FunctionDeclaration, GenerateRequest, GenerateResponse,
    ProviderInfo, RequestMetadata,
};
pub use campaign_registry::{CampaignRegistration, CampaignRegistry, RegistrationError};
pub use session_store::{SessionStore, SessionStoreError};
