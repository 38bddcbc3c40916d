//! Recovery of extraction payloads that the model wrote as text.

use serde_json::{Map, Value};

/// Strips Markdown code-fence markers and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) on the opening fence line.
        body = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Parses a model text reply as a JSON object.
///
/// Returns `None` when the sanitized text is not valid JSON or is not an
/// object; callers treat that as "no data produced".
pub fn parse_json_payload(text: &str) -> Option<Map<String, Value>> {
    let body = strip_code_fences(text);

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Some(map),
        Ok(other) => {
            tracing::debug!(kind = json_kind(&other), "Model text parsed as JSON but is not an object");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Model text is not a JSON payload");
            None
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
