//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Generative model providers (Gemini, scripted mock)
//! - `http` - REST endpoints (axum)
//! - `postgres` - Session persistence in PostgreSQL
//! - `registration` - Downstream campaign registry client
//! - `storage` - In-memory session store

pub mod ai;
pub mod http;
pub mod postgres;
pub mod registration;
pub mod storage;

pub use ai::{GeminiConfig, GeminiProvider, MockAIProvider};
pub use postgres::PostgresSessionStore;
pub use registration::HttpCampaignRegistry;
pub use storage::InMemorySessionStore;
