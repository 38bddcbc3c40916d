//! ProcessTurn command handler.
//!
//! Drives one user turn through the extraction phases:
//!
//! 1. Load the session, creating it on first contact
//! 2. Append the user message with a snapshot of the known brief data
//! 3. Ask the structured channel for an extraction call
//! 4. On free text, push a corrective turn and ask exactly once more
//! 5. Merge the extracted arguments and ask the free-text channel for an
//!    acknowledgement, or fall back to the model's text reply
//! 6. Persist (best effort) and respond

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::persistence::PersistenceBridge;
use crate::application::backoff::BackoffExecutor;
use crate::application::model_gateway::{ExtractionResult, ModelGateway, EXTRACTION_FUNCTION};
use crate::domain::brief::{
    is_blank, parse_json_payload, BriefField, ExtractionPhase, COMPLETION_FLAG,
};
use crate::domain::foundation::{SessionId, StateMachine, TraceId, ValidationError};
use crate::domain::session::{FunctionCall, Session, Turn};
use crate::ports::{AIError, RequestMetadata, SessionStore, SessionStoreError};

/// Warning attached to replies produced without structured extraction.
pub const EXTRACTION_FAILED_WARNING: &str = "extraction failed";

const CORRECTIVE_PROMPT: &str = "Llama ahora a la función extraer_datos_campania con los datos \
que ya conoces del brief. Deja vacíos los campos que el usuario no haya indicado.";

/// Command to process one chat turn.
#[derive(Debug, Clone, Default)]
pub struct ProcessTurnCommand {
    /// Client-supplied session identifier; required.
    pub session_id: Option<String>,
    pub user_message: String,
    pub user_id: Option<String>,
    pub campaign_id: Option<String>,
}

/// Shape of a turn's reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// Data was merged; the brief is not complete yet.
    DataCollected,
    /// Data was merged and the model flagged the brief complete.
    Completed,
    /// No structured data could be extracted.
    Message,
}

/// Outcome of a processed turn.
#[derive(Debug)]
pub struct ProcessTurnResult {
    pub kind: ReplyKind,
    pub text: String,
    pub collected_data: Map<String, Value>,
    pub missing_fields: Vec<BriefField>,
    pub warning: Option<String>,
    /// Handle of the detached registration task, when one was dispatched.
    pub registration: Option<JoinHandle<()>>,
}

/// Errors that can fail a turn.
#[derive(Debug, Error)]
pub enum ProcessTurnError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The model answered without a single candidate.
    #[error("Model returned no candidates")]
    ModelUnavailable,

    #[error("Model error: {0}")]
    Model(#[from] AIError),

    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What a structured call amounted to.
enum Extraction {
    Arguments(Map<String, Value>),
    Text(String),
}

/// Handler for chat turns.
pub struct ProcessTurnHandler {
    store: Arc<dyn SessionStore>,
    gateway: ModelGateway,
    backoff: BackoffExecutor,
    persistence: PersistenceBridge,
}

impl ProcessTurnHandler {
    pub fn new(
        store: Arc<dyn SessionStore>,
        gateway: ModelGateway,
        backoff: BackoffExecutor,
        persistence: PersistenceBridge,
    ) -> Self {
        Self {
            store,
            gateway,
            backoff,
            persistence,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessTurnCommand,
    ) -> Result<ProcessTurnResult, ProcessTurnError> {
        let session_id = SessionId::new(cmd.session_id.clone().unwrap_or_default())?;
        let trace_id = TraceId::new();
        let span = tracing::info_span!(
            "process_turn",
            session_id = %session_id,
            trace_id = %trace_id
        );

        self.run(session_id, trace_id, cmd).instrument(span).await
    }

    async fn run(
        &self,
        session_id: SessionId,
        trace_id: TraceId,
        cmd: ProcessTurnCommand,
    ) -> Result<ProcessTurnResult, ProcessTurnError> {
        let mut session = self.load_or_create(&session_id).await?;
        session.assign_owner(cmd.user_id.as_deref());
        session.assign_campaign(cmd.campaign_id.as_deref());

        let snapshot = session.data().render_snapshot();
        session.append(Turn::user(format!("{}\n\n{}", cmd.user_message, snapshot)));

        let metadata = RequestMetadata::new(session_id, trace_id);
        let phase = advance(ExtractionPhase::Start, ExtractionPhase::AwaitStructured)?;

        let first = self.call_structured(&session, &metadata).await?;
        let (args, phase) = match classify(first) {
            Extraction::Arguments(args) => (args, advance(phase, ExtractionPhase::MergeAndAck)?),
            Extraction::Text(first_text) => {
                if !first_text.trim().is_empty() {
                    session.append(Turn::model(first_text.clone()));
                }
                let snapshot = session.data().render_snapshot();
                session.append(Turn::user(format!("{}\n\n{}", CORRECTIVE_PROMPT, snapshot)));
                let phase = advance(phase, ExtractionPhase::RetryStructured)?;

                let retry = self.call_structured(&session, &metadata).await?;
                match classify(retry) {
                    Extraction::Arguments(args) => {
                        (args, advance(phase, ExtractionPhase::MergeAndAck)?)
                    }
                    Extraction::Text(retry_text) => {
                        tracing::debug!(text = %retry_text, "Retry produced free text again");
                        if !retry_text.trim().is_empty() {
                            session.append(Turn::model(retry_text.clone()));
                        }
                        let phase = advance(phase, ExtractionPhase::Fallback)?;
                        return self.fallback(session, first_text, retry_text, phase).await;
                    }
                }
            }
        };

        self.merge_and_ack(session, args, phase, &metadata).await
    }

    /// Finds the session or creates it. A failed create is resolved by
    /// re-reading, so concurrent first turns converge on one record.
    async fn load_or_create(&self, id: &SessionId) -> Result<Session, ProcessTurnError> {
        if let Some(session) = self.store.find_by_id(id).await? {
            return Ok(session);
        }

        let session = Session::new(id.clone());
        match self.store.create(&session).await {
            Ok(()) => {
                tracing::debug!("Created session");
                Ok(session)
            }
            Err(err) => {
                tracing::debug!(error = %err, "Session create failed, re-reading");
                match self.store.find_by_id(id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(err.into()),
                }
            }
        }
    }

    async fn call_structured(
        &self,
        session: &Session,
        metadata: &RequestMetadata,
    ) -> Result<ExtractionResult, ProcessTurnError> {
        let gateway = &self.gateway;
        let turns = session.turns();

        let result = self
            .backoff
            .execute("structured", move || gateway.structured(turns, metadata))
            .await?;

        result.ok_or_else(|| {
            tracing::error!("Structured channel returned no candidates");
            ProcessTurnError::ModelUnavailable
        })
    }

    async fn acknowledgement(&self, session: &Session, metadata: &RequestMetadata) -> Option<String> {
        let gateway = &self.gateway;
        let turns = session.turns();

        match self
            .backoff
            .execute("free_text", move || gateway.free_text(turns, metadata))
            .await
        {
            Ok(result) => result
                .and_then(ExtractionResult::into_text)
                .filter(|text| !text.trim().is_empty()),
            Err(err) => {
                tracing::warn!(error = %err, "Acknowledgement call failed");
                None
            }
        }
    }

    async fn merge_and_ack(
        &self,
        mut session: Session,
        args: Map<String, Value>,
        phase: ExtractionPhase,
        metadata: &RequestMetadata,
    ) -> Result<ProcessTurnResult, ProcessTurnError> {
        let args = prune_blank_arguments(args);
        let completed = matches!(args.get(COMPLETION_FLAG), Some(Value::Bool(true)));

        let written = session.merge_extraction(&args);
        tracing::debug!(fields = ?written, completed, "Merged extraction arguments");

        let missing_fields = session.data().missing_fields();
        session.append(Turn::function_call(FunctionCall {
            name: EXTRACTION_FUNCTION.to_string(),
            args,
        }));
        session.append(Turn::function_response(
            EXTRACTION_FUNCTION,
            json!({
                "collectedData": session.data(),
                "missingFields": missing_fields,
                "complete": completed,
            }),
        ));

        let registration = if completed {
            self.persistence.dispatch_registration(&session)
        } else {
            None
        };

        let text = match self.acknowledgement(&session, metadata).await {
            Some(text) => text,
            None => {
                tracing::warn!("No acknowledgement from model, using local reply");
                local_acknowledgement(&missing_fields, completed)
            }
        };
        session.append(Turn::model(text.clone()));

        advance(phase, ExtractionPhase::Respond)?;
        self.persistence.persist(&session).await;

        Ok(ProcessTurnResult {
            kind: if completed {
                ReplyKind::Completed
            } else {
                ReplyKind::DataCollected
            },
            text,
            collected_data: session.data().as_map().clone(),
            missing_fields,
            warning: None,
            registration,
        })
    }

    async fn fallback(
        &self,
        session: Session,
        first_text: String,
        retry_text: String,
        phase: ExtractionPhase,
    ) -> Result<ProcessTurnResult, ProcessTurnError> {
        tracing::warn!("Structured extraction failed twice, replying with model text");
        let missing_fields = session.data().missing_fields();

        let text = [first_text, retry_text]
            .into_iter()
            .find(|text| !text.trim().is_empty())
            .unwrap_or_else(|| local_acknowledgement(&missing_fields, false));

        advance(phase, ExtractionPhase::Respond)?;
        self.persistence.persist(&session).await;

        Ok(ProcessTurnResult {
            kind: ReplyKind::Message,
            text,
            collected_data: session.data().as_map().clone(),
            missing_fields,
            warning: Some(EXTRACTION_FAILED_WARNING.to_string()),
            registration: None,
        })
    }
}

fn advance(
    from: ExtractionPhase,
    to: ExtractionPhase,
) -> Result<ExtractionPhase, ProcessTurnError> {
    let next = from
        .transition_to(to)
        .map_err(|err| ProcessTurnError::Internal(err.to_string()))?;
    tracing::debug!(from = ?from, to = ?next, "Extraction phase");
    Ok(next)
}

/// Maps a model result onto the extraction path. Text that is really a JSON
/// object is recovered as arguments.
fn classify(result: ExtractionResult) -> Extraction {
    match result {
        ExtractionResult::FunctionCall(call) if call.name == EXTRACTION_FUNCTION => {
            Extraction::Arguments(call.args)
        }
        ExtractionResult::FunctionCall(call) => {
            tracing::warn!(function = %call.name, "Model called an undeclared function");
            Extraction::Text(String::new())
        }
        ExtractionResult::FreeText(text) => match parse_json_payload(&text) {
            Some(args) => {
                tracing::debug!("Recovered extraction arguments from text reply");
                Extraction::Arguments(args)
            }
            None => Extraction::Text(text),
        },
    }
}

/// Drops blank argument values; the completion flag always survives.
fn prune_blank_arguments(args: Map<String, Value>) -> Map<String, Value> {
    args.into_iter()
        .filter(|(key, value)| key == COMPLETION_FLAG || !is_blank(value))
        .collect()
}

fn local_acknowledgement(missing: &[BriefField], completed: bool) -> String {
    if completed {
        return "¡Perfecto! Ya tengo todos los datos del brief de tu campaña.".to_string();
    }
    match missing.first() {
        Some(field) => format!(
            "Gracias, lo he anotado. Para continuar necesito este dato: {}.",
            field.description()
        ),
        None => "Gracias, ya tengo todos los campos del brief. ¿Confirmas que está completo?"
            .to_string(),
    }
}
