//! AI Provider Port - Interface for generative model integrations.
//!
//! This port abstracts a single `generate` call against a generative model
//! that understands function declarations, so the orchestrator can drive the
//! extraction dialogue without coupling to a specific vendor API.
//!
//! # Design
//!
//! - Conversation content uses the domain [`Turn`] shape directly
//! - Responses keep the provider's candidate list; an empty list is a
//!   legitimate answer that callers must handle
//! - Error types separate rate limiting from every other failure

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::{SessionId, TraceId};
use crate::domain::session::{Part, Turn};

/// Port for generative model interactions.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Generate a response for the given conversation.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AIError>;

    /// Get provider information (name, model, capabilities).
    fn provider_info(&self) -> ProviderInfo;
}

/// A function the model may (or must) call instead of answering in text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// OpenAPI-style schema of the arguments.
    pub parameters: Value,
}

/// Request for a model generation.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Conversation turns, oldest first.
    pub contents: Vec<Turn>,
    /// System instruction guiding model behavior.
    pub system_instruction: Option<String>,
    /// Declared functions.
    pub functions: Vec<FunctionDeclaration>,
    /// When true the model must answer with a call to one of `functions`.
    pub force_function_call: bool,
    /// Temperature for response randomness.
    pub temperature: Option<f32>,
    /// Request metadata for tracing.
    pub metadata: RequestMetadata,
}

impl GenerateRequest {
    /// Creates a new request with required metadata.
    pub fn new(metadata: RequestMetadata) -> Self {
        Self {
            contents: Vec::new(),
            system_instruction: None,
            functions: Vec::new(),
            force_function_call: false,
            temperature: None,
            metadata,
        }
    }

    /// Sets the conversation turns.
    pub fn with_contents(mut self, contents: Vec<Turn>) -> Self {
        self.contents = contents;
        self
    }

    /// Sets the system instruction.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Declares a function and forces the model to call it.
    pub fn with_forced_function(mut self, function: FunctionDeclaration) -> Self {
        self.functions = vec![function];
        self.force_function_call = true;
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }
}

/// Request metadata for tracing.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// Session the request belongs to.
    pub session_id: SessionId,
    /// Trace ID correlating all calls of one turn.
    pub trace_id: TraceId,
}

impl RequestMetadata {
    /// Creates new request metadata.
    pub fn new(session_id: SessionId, trace_id: TraceId) -> Self {
        Self {
            session_id,
            trace_id,
        }
    }
}

/// Response from a model generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    /// Candidates in provider order; may be empty.
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Creates a response with a single candidate.
    pub fn single(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate { parts }],
        }
    }

    /// Creates a response with no candidates.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One candidate answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub parts: Vec<Part>,
}

/// Provider information and capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "gemini").
    pub name: String,
    /// Model identifier (e.g., "gemini-1.5-flash").
    pub model: String,
    /// Whether function calling is supported.
    pub supports_functions: bool,
}

impl ProviderInfo {
    /// Creates new provider info.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            supports_functions: true,
        }
    }
}

/// AI provider errors.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    /// Rate limited by provider (HTTP 429 or resource exhaustion).
    #[error("rate limited: {message}")]
    RateLimited {
        /// Provider message, if any.
        message: String,
    },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Provider rejected the request with an unexpected status.
    #[error("provider error {status}: {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u64,
    },
}

impl AIError {
    /// Creates a rate limited error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
