//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresSessionStore` - Durable session documents (turn log + brief data)

mod session_store;

pub use session_store::PostgresSessionStore;
