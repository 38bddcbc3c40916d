//! The brief data record and its merge rules.
//!
//! # Invariants
//!
//! - Only brief fields and the completion flag are ever stored.
//! - A field holding a non-blank value is never cleared by a merge: blank
//!   incoming values are dropped before anything is written.
//! - The completion flag is accepted whatever its value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::{BriefField, COMPLETION_FLAG};

/// Placeholder rendered for fields that hold no value yet.
const UNSET: &str = "(sin definir)";

/// Returns true for values that count as "no data": null, or a string that
/// is empty once trimmed.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Mapping from canonical field name to value; a subset of the brief schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BriefData(Map<String, Value>);

impl BriefData {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value held for a field, if any.
    pub fn get(&self, field: BriefField) -> Option<&Value> {
        self.0.get(field.as_str())
    }

    /// Returns the raw map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// True when the completion flag is set to `true`.
    pub fn is_complete(&self) -> bool {
        matches!(self.0.get(COMPLETION_FLAG), Some(Value::Bool(true)))
    }

    /// Brief fields whose current value is blank or absent, in schema order.
    pub fn missing_fields(&self) -> Vec<BriefField> {
        BriefField::ALL
            .into_iter()
            .filter(|field| self.get(*field).map_or(true, is_blank))
            .collect()
    }

    /// Merges extraction arguments into the record.
    ///
    /// Blank values are discarded (the completion flag excepted), keys outside
    /// the schema are ignored, everything else overwrites. Returns the keys
    /// that were written.
    pub fn merge(&mut self, incoming: &Map<String, Value>) -> Vec<String> {
        let mut written = Vec::new();

        for (key, value) in incoming {
            if key == COMPLETION_FLAG {
                self.0.insert(key.clone(), value.clone());
                written.push(key.clone());
                continue;
            }

            if key.parse::<BriefField>().is_err() {
                tracing::debug!(key = %key, "Ignoring argument outside the brief schema");
                continue;
            }

            if is_blank(value) {
                continue;
            }

            self.0.insert(key.clone(), value.clone());
            written.push(key.clone());
        }

        written
    }

    /// The record without the completion flag, as sent to the campaign registry.
    pub fn without_completion_flag(&self) -> Map<String, Value> {
        let mut map = self.0.clone();
        map.remove(COMPLETION_FLAG);
        map
    }

    /// Renders the known fields as a plain-text block for the model.
    pub fn render_snapshot(&self) -> String {
        let mut out = String::from("Datos actuales del brief:");
        for field in BriefField::ALL {
            let rendered = match self.get(field) {
                Some(value) if !is_blank(value) => render_value(value),
                _ => UNSET.to_string(),
            };
            out.push_str(&format!("\n- {}: {}", field, rendered));
        }
        out
    }
}

impl From<Map<String, Value>> for BriefData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
