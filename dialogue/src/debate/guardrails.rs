//! Termination guardrails for the moderator loop.

use serde::{Deserialize, Serialize};

use super::decision::{ModeratorAction, ModeratorDecision};

/// Why a moderated discussion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The round counter reached the configured maximum.
    RoundLimit { rounds: u32 },
    /// The moderator set `should_end`.
    ModeratorEnded,
    /// The moderator chose the end action.
    EndAction,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoundLimit { rounds } => write!(f, "round_limit ({})", rounds),
            Self::ModeratorEnded => write!(f, "moderator_ended"),
            Self::EndAction => write!(f, "end_action"),
        }
    }
}

/// Evaluates the loop's terminal conditions.
#[derive(Debug, Clone, Copy)]
pub struct LoopGuard {
    max_rounds: u32,
}

impl LoopGuard {
    pub fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Checked before each think step.
    pub fn before_round(&self, round: u32) -> Option<StopReason> {
        (round >= self.max_rounds).then_some(StopReason::RoundLimit { rounds: round })
    }

    /// Checked on each decoded decision, before execution.
    pub fn on_decision(&self, decision: &ModeratorDecision) -> Option<StopReason> {
        if decision.should_end {
            Some(StopReason::ModeratorEnded)
        } else if decision.action == ModeratorAction::EndDiscussion {
            Some(StopReason::EndAction)
        } else {
            None
        }
    }
}
