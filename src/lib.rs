//! Brief Agent - Conversational campaign-brief extraction
//!
//! This crate runs a chat turn loop that asks a generative model to pull a
//! fixed set of marketing-campaign fields out of free conversation, keeps the
//! accumulated brief per session, and hands completed briefs to a downstream
//! campaign registry.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
