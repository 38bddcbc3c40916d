//! Phases of one extraction turn.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Where a turn is in its progress from user message to response.
///
/// ```text
/// Start -> AwaitStructured -> MergeAndAck ---------------------> Respond
///                          \-> RetryStructured -> MergeAndAck -/
///                                              \-> Fallback ---/
/// ```
///
/// `RetryStructured` has no edge back to itself, so a turn makes at most
/// two structured calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPhase {
    Start,
    AwaitStructured,
    RetryStructured,
    MergeAndAck,
    Fallback,
    Respond,
}

impl StateMachine for ExtractionPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ExtractionPhase::*;
        match self {
            Start => vec![AwaitStructured],
            AwaitStructured => vec![MergeAndAck, RetryStructured],
            RetryStructured => vec![MergeAndAck, Fallback],
            MergeAndAck => vec![Respond],
            Fallback => vec![Respond],
            Respond => vec![],
        }
    }
}
