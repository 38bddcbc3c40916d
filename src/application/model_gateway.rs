//! Two logical channels over one generative model.
//!
//! The structured channel declares the extraction function and forces the
//! model to call it; the free-text channel declares nothing and is only used
//! for the conversational acknowledgement after a merge.

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use crate::domain::brief::{BriefField, COMPLETION_FLAG};
use crate::domain::session::{FunctionCall, Part, Turn};
use crate::ports::{AIError, AIProvider, FunctionDeclaration, GenerateRequest, RequestMetadata};

/// Name of the extraction function declared on the structured channel.
pub const EXTRACTION_FUNCTION: &str = "extraer_datos_campania";

const STRUCTURED_INSTRUCTION: &str = "Eres un asistente que ayuda a completar el brief de una \
campaña de marketing. En cada turno llama a la función extraer_datos_campania con los datos que \
el usuario haya proporcionado de forma explícita. No inventes ni supongas información: deja vacío \
cualquier campo que el usuario no haya indicado. Marca datos_completos como true solo cuando todos \
los campos tengan valor. En tu respuesta al usuario pide, de forma breve y amable, el siguiente \
dato que falte.";

const ACKNOWLEDGEMENT_INSTRUCTION: &str = "Eres un asistente que ayuda a completar el brief de \
una campaña de marketing. Responde en español, en una o dos frases: confirma los datos recién \
registrados y pide el siguiente dato que falte. Si el brief está completo, agradece y confírmalo.";

static EXTRACTION_DECLARATION: Lazy<FunctionDeclaration> = Lazy::new(|| {
    let mut properties = Map::new();
    for field in BriefField::ALL {
        properties.insert(
            field.as_str().to_string(),
            json!({ "type": "STRING", "description": field.description() }),
        );
    }
    properties.insert(
        COMPLETION_FLAG.to_string(),
        json!({
            "type": "BOOLEAN",
            "description": "true solo cuando todos los campos del brief tienen valor",
        }),
    );

    FunctionDeclaration {
        name: EXTRACTION_FUNCTION.to_string(),
        description: "Registra los datos del brief de campaña que el usuario ha proporcionado"
            .to_string(),
        parameters: json!({
            "type": "OBJECT",
            "properties": Value::Object(properties),
            "required": [COMPLETION_FLAG],
        }),
    }
});

/// The extraction function as declared to the model.
pub fn extraction_declaration() -> &'static FunctionDeclaration {
    &EXTRACTION_DECLARATION
}

/// What one model call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    FunctionCall(FunctionCall),
    FreeText(String),
}

impl ExtractionResult {
    /// Reads the first candidate's parts. A function call wins over text;
    /// text parts are concatenated.
    fn from_parts(parts: Vec<Part>) -> Self {
        let mut text = String::new();
        for part in parts {
            match part {
                Part::FunctionCall(call) => return ExtractionResult::FunctionCall(call),
                Part::Text(chunk) => text.push_str(&chunk),
                Part::FunctionResponse(_) => {}
            }
        }
        ExtractionResult::FreeText(text)
    }

    /// The text, when this is free text.
    pub fn into_text(self) -> Option<String> {
        match self {
            ExtractionResult::FreeText(text) => Some(text),
            ExtractionResult::FunctionCall(_) => None,
        }
    }
}

/// Structured and free-text access to the model.
pub struct ModelGateway {
    provider: Arc<dyn AIProvider>,
    temperature: f32,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn AIProvider>, temperature: f32) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    /// Asks the model for an extraction call over `turns`.
    ///
    /// `Ok(None)` means the model returned no candidate at all.
    pub async fn structured(
        &self,
        turns: &[Turn],
        metadata: &RequestMetadata,
    ) -> Result<Option<ExtractionResult>, AIError> {
        let request = GenerateRequest::new(metadata.clone())
            .with_contents(turns.to_vec())
            .with_system_instruction(STRUCTURED_INSTRUCTION)
            .with_forced_function(extraction_declaration().clone())
            .with_temperature(self.temperature);

        self.generate(request).await
    }

    /// Asks the model for a plain conversational reply over `turns`.
    pub async fn free_text(
        &self,
        turns: &[Turn],
        metadata: &RequestMetadata,
    ) -> Result<Option<ExtractionResult>, AIError> {
        let request = GenerateRequest::new(metadata.clone())
            .with_contents(turns.to_vec())
            .with_system_instruction(ACKNOWLEDGEMENT_INSTRUCTION)
            .with_temperature(self.temperature);

        self.generate(request).await
    }

    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<Option<ExtractionResult>, AIError> {
        let response = self.provider.generate(request).await?;
        Ok(response
            .candidates
            .into_iter()
            .next()
            .map(|candidate| ExtractionResult::from_parts(candidate.parts)))
    }
}
