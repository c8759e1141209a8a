//! Multi-party dialogue orchestration.
//!
//! Two drivers share one [`TurnLedger`](ledger::TurnLedger) and one
//! [`Actor`](actor::Actor):
//!
//! - [`DebateEngine`](scripted::DebateEngine) runs the fixed pro/con
//!   protocol.
//! - [`Moderator`](moderator::Moderator) lets a model pick each turn.
//!
//! # Session Flow
//!
//! ```text
//! Pending → Running ─┬─ all turns done / loop ended → Completed
//!                    ├─ model error / unknown member → Failed
//!                    └─ cancellation token fired     → Abandoned
//! ```
//!
//! Records appended before a failure stay in the ledger.

pub mod actor;
pub mod decision;
pub mod error;
pub mod guardrails;
pub mod ledger;
pub mod moderator;
pub mod prompts;
pub mod scripted;
pub mod state;

pub use actor::Actor;
pub use decision::{DecisionDecoder, ModeratorAction, ModeratorDecision, DEFAULT_INSTRUCTION};
pub use error::{DialogueError, DialogueResult};
pub use guardrails::{LoopGuard, StopReason};
pub use ledger::{QuestionExchange, TurnLedger, FREE_DEBATE_WINDOW};
pub use moderator::{
    DiscussionConfig, DiscussionOutcome, MemberSpec, Moderator, ModeratorState, DEFAULT_MAX_ROUNDS,
};
pub use scripted::{DebateConfig, DebateEngine, DebateOutcome};
pub use state::{
    Participant, Phase, SessionLifecycle, SessionStatus, Side, StatusTransition, Task, TaskType,
    TransitionError, UtteranceRecord,
};
