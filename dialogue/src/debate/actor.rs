//! Actor: turns a task plus its context window into one utterance.
//!
//! Actors are stateless. Everything a turn depends on comes from the
//! participant binding, the ledger and the task; the model is called once
//! with no tools and any failure is returned as-is.

use std::sync::Arc;

use tracing::debug;

use super::ledger::TurnLedger;
use super::prompts;
use super::state::{Participant, Task};
use crate::llm::{ChatMessage, LanguageModel, LlmError};

#[derive(Clone)]
pub struct Actor {
    model: Arc<dyn LanguageModel>,
}

impl Actor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// The exact message list sent to the model for this turn.
    pub fn build_messages(
        &self,
        participant: &Participant,
        ledger: &TurnLedger,
        task: &Task,
    ) -> Vec<ChatMessage> {
        let system = format!(
            "{}\n\n{}\n\n{}",
            participant.persona.prompt_fragment,
            prompts::stance_framing(participant, ledger.topic(), ledger.phase()),
            prompts::task_prompt(task),
        );

        let context = ledger.relevant_history(&participant.id, task.task_type);
        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(
            context
                .iter()
                .map(|r| ChatMessage::user(format!("{}: {}", r.speaker_name, r.content))),
        );
        messages.push(ChatMessage::user(task.instruction.clone()));
        messages
    }

    /// Produce one utterance. No retries.
    pub async fn speak(
        &self,
        participant: &Participant,
        ledger: &TurnLedger,
        task: &Task,
    ) -> Result<String, LlmError> {
        let messages = self.build_messages(participant, ledger, task);
        debug!(
            speaker = %participant.id,
            task = %task.task_type,
            context = messages.len() - 2,
            prompt_version = prompts::PROMPT_VERSION,
            "Actor invoking model"
        );
        let completion = self.model.invoke(&messages, None).await?;
        Ok(completion.content)
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor").finish_non_exhaustive()
    }
}
