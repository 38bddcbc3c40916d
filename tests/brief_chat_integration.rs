//! Integration tests for the chat endpoint.
//!
//! These tests drive the assembled router end to end with a scripted model,
//! the in-memory session store and a recording campaign registry.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use brief_agent::adapters::ai::MockAIProvider;
use brief_agent::adapters::http::{api_router, BriefHandlers};
use brief_agent::adapters::storage::InMemorySessionStore;
use brief_agent::application::{
    BackoffExecutor, ModelGateway, PersistenceBridge, ProcessTurnHandler, RetryPolicy,
    EXTRACTION_FUNCTION,
};
use brief_agent::config::ServerConfig;
use brief_agent::domain::foundation::SessionId;
use brief_agent::ports::{
    AIError, CampaignRegistration, CampaignRegistry, RegistrationError, SessionStore,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Default)]
struct RecordingRegistry {
    received: Mutex<Vec<CampaignRegistration>>,
}

impl RecordingRegistry {
    fn received(&self) -> Vec<CampaignRegistration> {
        self.received.lock().unwrap().clone()
    }

    /// Registration runs detached from the response, so wait for it.
    async fn wait_for(&self, count: usize) -> Vec<CampaignRegistration> {
        for _ in 0..100 {
            let received = self.received();
            if received.len() >= count {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.received()
    }
}

#[async_trait]
impl CampaignRegistry for RecordingRegistry {
    async fn register(&self, registration: CampaignRegistration) -> Result<(), RegistrationError> {
        self.received.lock().unwrap().push(registration);
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemorySessionStore>,
    registry: Arc<RecordingRegistry>,
    provider: MockAIProvider,
}

impl TestApp {
    fn new(provider: MockAIProvider) -> Self {
        let store = Arc::new(InMemorySessionStore::new());
        let registry = Arc::new(RecordingRegistry::default());

        let handler = ProcessTurnHandler::new(
            store.clone(),
            ModelGateway::new(Arc::new(provider.clone()), 0.2),
            BackoffExecutor::new(RetryPolicy::new(2, Duration::from_millis(1))),
            PersistenceBridge::new(store.clone(), Some(registry.clone())),
        );
        let router = api_router(
            BriefHandlers::new(Arc::new(handler)),
            &ServerConfig::default(),
        );

        Self {
            router,
            store,
            registry,
            provider,
        }
    }

    async fn chat(&self, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn stored_data(&self, id: &str) -> Value {
        let session = self
            .store
            .find_by_id(&SessionId::new(id).unwrap())
            .await
            .unwrap()
            .expect("session stored");
        serde_json::to_value(session.data()).unwrap()
    }
}

fn missing(json: &Value) -> Vec<String> {
    json["missingFields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Extraction flow
// =============================================================================

#[tokio::test]
async fn first_turn_collects_extracted_fields() {
    let app = TestApp::new(
        MockAIProvider::new()
            .with_function_call(
                EXTRACTION_FUNCTION,
                json!({ "Description": "lanzamiento", "datos_completos": false }),
            )
            .with_text("¡Genial! ¿Qué tipo de contenido necesitas?"),
    );

    let (status, json) = app
        .chat(json!({ "sessionID": "s1", "userMessage": "Quiero lanzar una campaña" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "data_collected");
    assert_eq!(json["success"], true);
    assert_eq!(json["collectedData"]["Description"], "lanzamiento");
    assert_eq!(json["text"], "¡Genial! ¿Qué tipo de contenido necesitas?");

    let missing = missing(&json);
    assert!(missing.contains(&"ContentType".to_string()));
    assert!(missing.contains(&"Objective".to_string()));
    assert!(!missing.contains(&"Description".to_string()));

    assert_eq!(app.stored_data("s1").await["Description"], "lanzamiento");
    assert!(app.registry.received().is_empty());
}

#[tokio::test]
async fn completion_registers_campaign_once_without_flag() {
    let app = TestApp::new(
        MockAIProvider::new()
            .with_function_call(
                EXTRACTION_FUNCTION,
                json!({ "Description": "lanzamiento", "datos_completos": false }),
            )
            .with_text("Anotado.")
            .with_function_call(
                EXTRACTION_FUNCTION,
                json!({ "ContentType": "video", "datos_completos": true }),
            )
            .with_text("¡Listo!"),
    );

    app.chat(json!({ "sessionID": "s1", "userMessage": "Quiero lanzar una campaña" }))
        .await;
    let (status, json) = app
        .chat(json!({
            "sessionID": "s1",
            "userMessage": "Un video, y eso es todo",
            "campaignId": "camp-9"
        }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "completed");
    assert_eq!(json["collectedData"]["Description"], "lanzamiento");
    assert_eq!(json["collectedData"]["ContentType"], "video");

    let received = app.registry.wait_for(1).await;
    assert_eq!(received.len(), 1);
    assert!(received[0].data.get("datos_completos").is_none());
    assert_eq!(received[0].data["ContentType"], "video");
    assert_eq!(received[0].campaign_id.as_deref(), Some("camp-9"));

    // No further registration shows up later.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(app.registry.received().len(), 1);
}

#[tokio::test]
async fn free_text_twice_falls_back_with_warning() {
    let app = TestApp::new(
        MockAIProvider::new()
            .with_function_call(
                EXTRACTION_FUNCTION,
                json!({ "Description": "lanzamiento", "datos_completos": false }),
            )
            .with_text("Anotado.")
            .with_text("¿Me cuentas más sobre el objetivo?")
            .with_text("¿Cuál es el objetivo principal?"),
    );

    app.chat(json!({ "sessionID": "s1", "userMessage": "Quiero lanzar una campaña" }))
        .await;
    let before = app.stored_data("s1").await;

    let (status, json) = app
        .chat(json!({ "sessionID": "s1", "userMessage": "No estoy seguro" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "message");
    assert!(json["warning"].is_string());
    assert!(json.get("success").is_none());
    assert_eq!(json["text"], "¿Me cuentas más sobre el objetivo?");
    assert_eq!(json["collectedData"], before);
    assert_eq!(app.stored_data("s1").await, before);
    assert!(app.registry.received().is_empty());
}

#[tokio::test]
async fn rate_limited_call_is_retried_transparently() {
    let app = TestApp::new(
        MockAIProvider::new()
            .with_error(AIError::rate_limited("RESOURCE_EXHAUSTED"))
            .with_function_call(
                EXTRACTION_FUNCTION,
                json!({ "Objective": "ventas", "datos_completos": false }),
            )
            .with_text("Perfecto."),
    );

    let (status, json) = app
        .chat(json!({ "sessionID": "s1", "userMessage": "Quiero vender más" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["collectedData"]["Objective"], "ventas");
    assert_eq!(app.provider.call_count(), 3);
}

// =============================================================================
// Error paths
// =============================================================================

#[tokio::test]
async fn missing_session_id_is_bad_request() {
    let app = TestApp::new(MockAIProvider::new());

    let (status, json) = app.chat(json!({ "userMessage": "Hola" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
    assert_eq!(app.provider.call_count(), 0);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = TestApp::new(MockAIProvider::new());

    let (status, json) = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn no_candidates_is_server_error() {
    let app = TestApp::new(MockAIProvider::new().with_no_candidates());

    let (status, json) = app
        .chat(json!({ "sessionID": "s1", "userMessage": "Hola" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "No response from the model");
}

#[tokio::test]
async fn provider_failure_is_server_error() {
    let app = TestApp::new(MockAIProvider::new().with_error(AIError::AuthenticationFailed));

    let (status, json) = app
        .chat(json!({ "sessionID": "s1", "userMessage": "Hola" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Internal server error");
    assert_eq!(app.provider.call_count(), 1);
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn concurrent_first_turns_share_one_session() {
    let app = TestApp::new(MockAIProvider::new().with_delay(Duration::from_millis(5)));

    let body = json!({ "sessionID": "race", "userMessage": "Hola" });
    let (first, second) = tokio::join!(app.chat(body.clone()), app.chat(body));

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(app.store.session_count().await, 1);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = TestApp::new(MockAIProvider::new());

    let (status, json) = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}
