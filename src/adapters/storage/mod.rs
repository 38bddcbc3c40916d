//! Storage Adapters
//!
//! In-process implementation of the SessionStore port.
//!
//! ## Available Adapters
//!
//! - **InMemorySessionStore** - Stores sessions in memory (testing/development)
//!
//! The durable store lives in `adapters::postgres`.

mod in_memory_session_store;

pub use in_memory_session_store::InMemorySessionStore;
