//! State machine trait for phase enums.
//!
//! Gives phase enums a single place to declare their legal hops, and a
//! checked `transition_to` that refuses anything else.

use super::ValidationError;

/// A finite set of phases with declared transitions.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for ExtractionPhase {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         self.valid_transitions().contains(target)
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Start => vec![AwaitStructured],
///             // ...
///         }
///     }
/// }
///
/// let phase = phase.transition_to(ExtractionPhase::RetryStructured)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Whether `target` is a legal next phase.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Every legal next phase.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Moves to `target`, or fails with `invalid_format` naming both phases.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// No legal next phase exists.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
