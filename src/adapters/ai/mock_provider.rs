//! Mock AI Provider for testing.
//!
//! Provides a scripted implementation of the AIProvider port, so the
//! extraction flow can be exercised without calling a real model.
//!
//! # Features
//!
//! - Pre-configured responses, consumed in order
//! - Error injection for retry and failure paths
//! - Simulated delays
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_function_call("extraer_datos_campania", json!({ "Description": "lanzamiento" }))
//!     .with_text("Anotado. ¿Qué tipo de contenido necesitas?");
//!
//! let response = provider.generate(request).await?;
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::session::{FunctionCall, Part};
use crate::ports::{AIError, AIProvider, GenerateRequest, GenerateResponse, ProviderInfo};

/// Text returned once the script is exhausted.
pub const DEFAULT_MOCK_TEXT: &str = "Mock response";

/// Mock AI provider for testing.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Scripted outcomes (consumed in order).
    responses: Arc<Mutex<VecDeque<Result<GenerateResponse, AIError>>>>,
    /// Provider info to return.
    info: ProviderInfo,
    /// Simulated latency per request.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    /// Creates a new mock provider with an empty script.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a raw response to the script.
    pub fn with_response(self, response: GenerateResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Adds a single-candidate text response.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(GenerateResponse::single(vec![Part::Text(text.into())]))
    }

    /// Adds a single-candidate function call response. `args` must be a JSON
    /// object; anything else is sent as an empty argument map.
    pub fn with_function_call(self, name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        self.with_response(GenerateResponse::single(vec![Part::FunctionCall(
            FunctionCall {
                name: name.into(),
                args,
            },
        )]))
    }

    /// Adds a response with no candidates.
    pub fn with_no_candidates(self) -> Self {
        self.with_response(GenerateResponse::empty())
    }

    /// Adds an error to the script.
    pub fn with_error(self, error: AIError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<GenerateRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Gets the next scripted outcome, or a default text response.
    fn next_response(&self) -> Result<GenerateResponse, AIError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(GenerateResponse::single(vec![Part::Text(
                    DEFAULT_MOCK_TEXT.to_string(),
                )]))
            })
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AIError> {
        self.calls.lock().unwrap().push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        self.next_response()
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SessionId, TraceId};
    use crate::ports::RequestMetadata;
    use serde_json::json;

    fn test_request() -> GenerateRequest {
        GenerateRequest::new(RequestMetadata::new(
            SessionId::new("test-session").unwrap(),
            TraceId::new(),
        ))
    }

    fn first_part(response: &GenerateResponse) -> &Part {
        &response.candidates[0].parts[0]
    }

    #[tokio::test]
    async fn mock_provider_returns_responses_in_order() {
        let provider = MockAIProvider::new()
            .with_text("First")
            .with_function_call("f", json!({ "Description": "x" }));

        let r1 = provider.generate(test_request()).await.unwrap();
        let r2 = provider.generate(test_request()).await.unwrap();

        assert_eq!(first_part(&r1), &Part::Text("First".into()));
        match first_part(&r2) {
            Part::FunctionCall(call) => {
                assert_eq!(call.name, "f");
                assert_eq!(call.args["Description"], "x");
            }
            other => panic!("Expected function call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn mock_provider_returns_default_after_exhausted() {
        let provider = MockAIProvider::new().with_no_candidates();

        let r1 = provider.generate(test_request()).await.unwrap();
        let r2 = provider.generate(test_request()).await.unwrap();

        assert!(r1.candidates.is_empty());
        assert_eq!(first_part(&r2), &Part::Text(DEFAULT_MOCK_TEXT.into()));
    }

    #[tokio::test]
    async fn mock_provider_returns_configured_error() {
        let provider = MockAIProvider::new().with_error(AIError::rate_limited("quota"));

        let result = provider.generate(test_request()).await;

        assert!(matches!(result, Err(AIError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn mock_provider_tracks_calls() {
        let provider = MockAIProvider::new();
        assert_eq!(provider.call_count(), 0);

        provider.generate(test_request()).await.unwrap();
        provider.generate(test_request()).await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.get_calls().len(), 2);
    }

    #[tokio::test]
    async fn clones_share_script_and_history() {
        let provider = MockAIProvider::new().with_text("shared");
        let clone = provider.clone();

        let response = clone.generate(test_request()).await.unwrap();

        assert_eq!(first_part(&response), &Part::Text("shared".into()));
        assert_eq!(provider.call_count(), 1);
    }
}
