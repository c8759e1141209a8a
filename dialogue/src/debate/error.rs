//! Error type for orchestration runs.

use thiserror::Error;

use super::state::{Phase, TaskType, TransitionError};
use crate::llm::LlmError;
use crate::persona::ActorId;

pub type DialogueResult<T> = Result<T, DialogueError>;

#[derive(Debug, Error)]
pub enum DialogueError {
    /// The model failed while an actor was producing a turn.
    #[error("{phase} turn {turn} ({speaker}, {task}) failed")]
    Turn {
        phase: Phase,
        /// Zero-based position the record would have taken in the history.
        turn: usize,
        speaker: ActorId,
        task: TaskType,
        #[source]
        source: LlmError,
    },

    /// The model failed while the moderator was deciding.
    #[error("moderator decision failed at round {round}")]
    Moderator {
        round: u32,
        #[source]
        source: LlmError,
    },

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("no persona registered for '{0}'")]
    UnknownPersona(ActorId),

    #[error("session abandoned after {completed_turns} turns")]
    Cancelled { completed_turns: usize },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl DialogueError {
    /// Phase the failing turn belonged to, when the error came from a turn.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Turn { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether the failure came from the language model.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, Self::Turn { .. } | Self::Moderator { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_error_identifies_phase() {
        let err = DialogueError::Turn {
            phase: Phase::Questioning,
            turn: 5,
            speaker: ActorId::new("anon"),
            task: TaskType::Answer,
            source: LlmError::Timeout,
        };
        assert_eq!(err.phase(), Some(Phase::Questioning));
        assert!(err.is_model_failure());
        assert_eq!(err.to_string(), "questioning turn 5 (anon, answer) failed");
        let source = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("request timed out"));
    }

    #[test]
    fn test_moderator_error_leaves_cause_to_source() {
        let err = DialogueError::Moderator {
            round: 2,
            source: LlmError::Timeout,
        };
        assert_eq!(err.to_string(), "moderator decision failed at round 2");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_member_not_found_display() {
        let err = DialogueError::MemberNotFound("sakiko".to_string());
        assert_eq!(err.to_string(), "member not found: sakiko");
        assert_eq!(err.phase(), None);
        assert!(!err.is_model_failure());
    }
}
