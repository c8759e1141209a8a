//! Scripted debate engine: the fixed three-phase pro/con protocol.
//!
//! ```text
//! Opening      pro[0..] then con[0..]
//! Questioning  for i in 0..len(pro):
//!                pro[i] asks con[i % len(con)], who answers
//!                con[i % len(con)] asks pro[i], who answers
//! Closing      con[0..] then pro[0..]
//! ```
//!
//! Uneven sides never error: the con index wraps, so with three pro and two
//! con participants pro[2] is paired with con[0] again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::actor::Actor;
use super::error::{DialogueError, DialogueResult};
use super::ledger::TurnLedger;
use super::prompts;
use super::state::{
    Participant, Phase, SessionLifecycle, SessionStatus, Side, Task, TaskType, UtteranceRecord,
};
use crate::llm::LanguageModel;
use crate::persona::{ActorId, PersonaProvider};
use crate::transcript::{deliver_logged, NullSink, TranscriptSink};

/// Configuration for one scripted debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    pub topic: String,
    #[serde(default)]
    pub pro_stance: String,
    #[serde(default)]
    pub con_stance: String,
    pub pro: Vec<ActorId>,
    pub con: Vec<ActorId>,
    /// Stances imposed on individual participants regardless of side.
    #[serde(default)]
    pub forced_stances: HashMap<ActorId, String>,
}

impl DebateConfig {
    pub fn new(topic: impl Into<String>, pro: Vec<ActorId>, con: Vec<ActorId>) -> Self {
        Self {
            topic: topic.into(),
            pro_stance: String::new(),
            con_stance: String::new(),
            pro,
            con,
            forced_stances: HashMap::new(),
        }
    }

    pub fn with_stances(mut self, pro: impl Into<String>, con: impl Into<String>) -> Self {
        self.pro_stance = pro.into();
        self.con_stance = con.into();
        self
    }

    pub fn force(mut self, id: impl Into<ActorId>, stance: impl Into<String>) -> Self {
        self.forced_stances.insert(id.into(), stance.into());
        self
    }

    /// Check the configuration before any turn is taken.
    pub fn validate(&self, personas: &dyn PersonaProvider) -> DialogueResult<()> {
        if self.topic.trim().is_empty() {
            return Err(DialogueError::InvalidConfig("topic is empty".into()));
        }
        if self.pro.is_empty() {
            return Err(DialogueError::InvalidConfig(
                "pro side has no participants".into(),
            ));
        }
        if self.con.is_empty() {
            return Err(DialogueError::InvalidConfig(
                "con side has no participants".into(),
            ));
        }

        let mut seen = HashSet::new();
        for id in self.pro.iter().chain(&self.con) {
            if !seen.insert(id) {
                return Err(DialogueError::InvalidConfig(format!(
                    "'{id}' appears more than once"
                )));
            }
        }

        if let Some(stray) = self.forced_stances.keys().find(|id| !seen.contains(id)) {
            return Err(DialogueError::InvalidConfig(format!(
                "forced stance for '{stray}', who is not a participant"
            )));
        }

        for id in &seen {
            if personas.resolve(id).is_none() {
                return Err(DialogueError::UnknownPersona((*id).clone()));
            }
        }
        Ok(())
    }

    fn side_stance(&self, side: Side) -> &str {
        match side {
            Side::Pro => &self.pro_stance,
            Side::Con => &self.con_stance,
        }
    }
}

/// Result of a completed debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    pub session_id: String,
    pub topic: String,
    pub records: Vec<UtteranceRecord>,
    pub turns: usize,
}

impl DebateOutcome {
    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[DEBATE] {} turns | session={} | topic={}",
            self.turns, self.session_id, self.topic
        )
    }
}

/// Drives one scripted debate from opening to closing.
pub struct DebateEngine {
    pro: Vec<Participant>,
    con: Vec<Participant>,
    actor: Actor,
    ledger: TurnLedger,
    lifecycle: SessionLifecycle,
    sink: Arc<dyn TranscriptSink>,
    cancel: CancellationToken,
}

impl DebateEngine {
    pub fn new(
        config: DebateConfig,
        model: Arc<dyn LanguageModel>,
        personas: &dyn PersonaProvider,
    ) -> DialogueResult<Self> {
        config.validate(personas)?;

        let bind = |ids: &[ActorId], side: Side| -> DialogueResult<Vec<Participant>> {
            ids.iter()
                .map(|id| -> DialogueResult<Participant> {
                    let persona = personas
                        .resolve(id)
                        .ok_or_else(|| DialogueError::UnknownPersona(id.clone()))?;
                    let participant =
                        Participant::new(id.clone(), persona, config.side_stance(side));
                    Ok(match config.forced_stances.get(id) {
                        Some(stance) => participant.forced(stance.clone()),
                        None => participant,
                    })
                })
                .collect()
        };
        let pro = bind(&config.pro, Side::Pro)?;
        let con = bind(&config.con, Side::Con)?;

        Ok(Self {
            pro,
            con,
            actor: Actor::new(model),
            ledger: TurnLedger::new(config.topic),
            lifecycle: SessionLifecycle::new(),
            sink: Arc::new(NullSink),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.lifecycle.id
    }

    pub fn status(&self) -> SessionStatus {
        self.lifecycle.status
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    /// The ledger, including records produced before a failure.
    pub fn ledger(&self) -> &TurnLedger {
        &self.ledger
    }

    /// Run all three phases. A session can only be run once.
    pub async fn run(&mut self) -> DialogueResult<DebateOutcome> {
        self.lifecycle
            .transition(SessionStatus::Running, "debate started")?;
        info!(
            session_id = %self.lifecycle.id,
            topic = self.ledger.topic(),
            pro = self.pro.len(),
            con = self.con.len(),
            "Debate started"
        );

        match self.run_phases().await {
            Ok(()) => {
                self.lifecycle
                    .transition(SessionStatus::Completed, "closing finished")?;
                info!(
                    session_id = %self.lifecycle.id,
                    turns = self.ledger.len(),
                    "Debate completed"
                );
                Ok(DebateOutcome {
                    session_id: self.lifecycle.id.clone(),
                    topic: self.ledger.topic().to_string(),
                    records: self.ledger.history().to_vec(),
                    turns: self.ledger.len(),
                })
            }
            Err(err) => {
                let to = match err {
                    DialogueError::Cancelled { .. } => SessionStatus::Abandoned,
                    _ => SessionStatus::Failed,
                };
                self.lifecycle.transition(to, &err.to_string())?;
                warn!(
                    session_id = %self.lifecycle.id,
                    status = %to,
                    turns = self.ledger.len(),
                    error = %err,
                    "Debate stopped early"
                );
                Err(err)
            }
        }
    }

    async fn run_phases(&mut self) -> DialogueResult<()> {
        let pro = self.pro.clone();
        let con = self.con.clone();

        self.ledger.set_phase(Phase::Opening);
        for speaker in pro.iter().chain(&con) {
            let task = Task::new(TaskType::Opening, prompts::OPENING_INSTRUCTION);
            self.take_turn(speaker, task, None).await?;
        }

        self.ledger.set_phase(Phase::Questioning);
        for (i, asker) in pro.iter().enumerate() {
            let responder = &con[i % con.len()];
            self.exchange(asker, responder).await?;
            self.exchange(responder, asker).await?;
        }

        self.ledger.set_phase(Phase::Closing);
        for speaker in con.iter().chain(&pro) {
            let task = Task::new(TaskType::Closing, prompts::CLOSING_INSTRUCTION);
            self.take_turn(speaker, task, None).await?;
        }
        Ok(())
    }

    /// One question from `asker` to `responder` and the answer to it.
    async fn exchange(&mut self, asker: &Participant, responder: &Participant) -> DialogueResult<()> {
        let task = Task::new(
            TaskType::Question,
            prompts::question_instruction(responder.display_name()),
        )
        .aimed_at(responder.display_name());
        let idx = self
            .take_turn(asker, task, Some(responder.id.clone()))
            .await?;
        let question = self.ledger.history()[idx].content.clone();

        let task = Task::new(
            TaskType::Answer,
            prompts::answer_instruction(asker.display_name(), &question),
        )
        .aimed_at(asker.display_name());
        self.take_turn(responder, task, Some(asker.id.clone()))
            .await?;
        Ok(())
    }

    /// Produce, append and deliver one record. Returns its history index.
    async fn take_turn(
        &mut self,
        speaker: &Participant,
        task: Task,
        target: Option<ActorId>,
    ) -> DialogueResult<usize> {
        let turn = self.ledger.len();
        if self.cancel.is_cancelled() {
            return Err(DialogueError::Cancelled {
                completed_turns: turn,
            });
        }

        let phase = self.ledger.phase();
        debug!(turn, %phase, speaker = %speaker.id, task = %task.task_type, "Taking turn");

        let content = self
            .actor
            .speak(speaker, &self.ledger, &task)
            .await
            .map_err(|source| DialogueError::Turn {
                phase,
                turn,
                speaker: speaker.id.clone(),
                task: task.task_type,
                source,
            })?;

        let record = UtteranceRecord::new(speaker, content, phase, task.task_type).with_target(target);
        let idx = self.ledger.append(record);
        deliver_logged(self.sink.as_ref(), idx, &self.ledger.history()[idx]);
        Ok(idx)
    }
}
