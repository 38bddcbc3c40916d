//! Gemini Provider - Implementation of AIProvider for Google's Gemini API.
//!
//! Calls `models/{model}:generateContent` with function declarations and,
//! when the request forces a call, `functionCallingConfig.mode = "ANY"`.
//!
//! # Configuration
//!
//! ```ignore
//! let config = GeminiConfig::new(api_key)
//!     .with_model("gemini-1.5-flash")
//!     .with_timeout(Duration::from_secs(60));
//!
//! let provider = GeminiProvider::new(config)?;
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::domain::session::{FunctionCall, Part, Role, Turn};
use crate::ports::{
    AIError, AIProvider, Candidate, FunctionDeclaration, GenerateRequest, GenerateResponse,
    ProviderInfo,
};

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use (e.g., "gemini-1.5-flash").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_secret(Secret::new(api_key.into()))
    }

    /// Creates a new configuration from an already-wrapped key.
    pub fn from_secret(api_key: Secret<String>) -> Self {
        Self {
            api_key,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Gemini API provider implementation.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider with the given configuration.
    pub fn new(config: GeminiConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn send_request(&self, request: &GenerateRequest) -> Result<Response, AIError> {
        let body = to_gemini_request(request);

        self.client
            .post(self.generate_url())
            .header("x-goog-api-key", self.config.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_secs: self.config.timeout.as_secs(),
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }
}

#[async_trait]
impl AIProvider for GeminiProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AIError> {
        tracing::debug!(
            model = %self.config.model,
            turns = request.contents.len(),
            forced = request.force_function_call,
            "Calling Gemini"
        );

        let response = self.send_request(&request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AIError::network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        parse_response_body(&body)
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("gemini", self.config.model.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Wire format
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionCallingConfig {
    mode: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allowed_function_names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

/// Response parts may carry extra keys (thought signatures and the like),
/// so they are read field by field rather than as a tagged [`Part`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn to_gemini_request(request: &GenerateRequest) -> GeminiRequest {
    let declares_functions = !request.functions.is_empty();

    let contents = if declares_functions {
        request.contents.clone()
    } else {
        request.contents.iter().map(flatten_function_parts).collect()
    };

    let tool_config = (declares_functions && request.force_function_call).then(|| {
        GeminiToolConfig {
            function_calling_config: FunctionCallingConfig {
                mode: "ANY",
                allowed_function_names: request.functions.iter().map(|f| f.name.clone()).collect(),
            },
        }
    });

    GeminiRequest {
        contents,
        system_instruction: request.system_instruction.as_ref().map(|text| {
            GeminiSystemInstruction {
                parts: vec![Part::Text(text.clone())],
            }
        }),
        tools: if declares_functions {
            vec![GeminiTool {
                function_declarations: request.functions.clone(),
            }]
        } else {
            Vec::new()
        },
        tool_config,
        generation_config: request
            .temperature
            .map(|temperature| GeminiGenerationConfig { temperature }),
    }
}

/// Rewrites function parts as text, for requests that declare no functions.
fn flatten_function_parts(turn: &Turn) -> Turn {
    let role = match turn.role {
        Role::Function => Role::User,
        other => other,
    };
    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => Part::Text(text.clone()),
            Part::FunctionCall(call) => Part::Text(format!(
                "[{}] {}",
                call.name,
                Value::Object(call.args.clone())
            )),
            Part::FunctionResponse(response) => {
                Part::Text(format!("[{}] {}", response.name, response.response))
            }
        })
        .collect();

    Turn { role, parts }
}

fn parse_response_body(body: &str) -> Result<GenerateResponse, AIError> {
    let parsed: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

    let candidates = parsed
        .candidates
        .into_iter()
        .map(|candidate| Candidate {
            parts: candidate
                .content
                .map(|content| content.parts)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|part| match (part.function_call, part.text) {
                    (Some(call), _) => Some(Part::FunctionCall(call)),
                    (None, Some(text)) => Some(Part::Text(text)),
                    (None, None) => None,
                })
                .collect(),
        })
        .collect();

    Ok(GenerateResponse { candidates })
}

fn classify_error(status: u16, body: &str) -> AIError {
    let detail = serde_json::from_str::<GeminiErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| body.to_string());
    let exhausted = detail
        .as_ref()
        .and_then(|d| d.status.as_deref())
        .map_or(false, |s| s == "RESOURCE_EXHAUSTED");

    match status {
        429 => AIError::rate_limited(message),
        _ if exhausted => AIError::rate_limited(message),
        401 | 403 => AIError::AuthenticationFailed,
        500..=599 => AIError::unavailable(format!("Server error {}: {}", status, message)),
        _ => AIError::Provider { status, message },
    }
}
