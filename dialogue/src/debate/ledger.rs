//! Turn ledger: append-only utterance log plus per-phase indices and the
//! context-window policy.
//!
//! The global history is the only source of truth. Opening statements,
//! closing statements and question/answer exchanges are kept as indices into
//! that history and are only ever updated by [`TurnLedger::append`], so a
//! projection can never disagree with the log it was derived from.
//!
//! # Context windows
//!
//! | Task          | Visible records                                              |
//! |---------------|--------------------------------------------------------------|
//! | `opening`     | none                                                         |
//! | `question`    | every other participant's opening, in history order          |
//! | `answer`      | own opening + the last record iff it is a question           |
//! | `closing`     | own opening + each exchange involving the speaker (Q then A) |
//! | `free_debate` | last [`FREE_DEBATE_WINDOW`] records                          |
//! | `rebuttal`    | none                                                         |

use std::collections::HashMap;

use super::state::{Phase, TaskType, UtteranceRecord};
use crate::persona::ActorId;

/// Number of trailing records visible to a free-debate turn.
pub const FREE_DEBATE_WINDOW: usize = 3;

/// A question record paired with the answer given to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionExchange<'a> {
    pub question: &'a UtteranceRecord,
    pub answer: &'a UtteranceRecord,
}

impl QuestionExchange<'_> {
    pub fn questioner(&self) -> &ActorId {
        &self.question.speaker
    }

    pub fn answerer(&self) -> &ActorId {
        &self.answer.speaker
    }

    pub fn involves(&self, id: &ActorId) -> bool {
        self.questioner() == id || self.answerer() == id
    }
}

/// Orchestration context for one debate or discussion session.
#[derive(Debug, Clone)]
pub struct TurnLedger {
    topic: String,
    phase: Phase,
    history: Vec<UtteranceRecord>,
    openings: HashMap<ActorId, usize>,
    closings: HashMap<ActorId, usize>,
    /// (question index, answer index) pairs in the order they completed.
    exchanges: Vec<(usize, usize)>,
}

impl TurnLedger {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            phase: Phase::Opening,
            history: Vec::new(),
            openings: HashMap::new(),
            closings: HashMap::new(),
            exchanges: Vec::new(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn history(&self) -> &[UtteranceRecord] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> Option<&UtteranceRecord> {
        self.history.last()
    }

    /// Latest opening statement by `id`, if any.
    pub fn opening_of(&self, id: &ActorId) -> Option<&UtteranceRecord> {
        self.openings.get(id).map(|&idx| &self.history[idx])
    }

    /// Latest closing statement by `id`, if any.
    pub fn closing_of(&self, id: &ActorId) -> Option<&UtteranceRecord> {
        self.closings.get(id).map(|&idx| &self.history[idx])
    }

    pub fn has_opened(&self, id: &ActorId) -> bool {
        self.openings.contains_key(id)
    }

    pub fn has_closed(&self, id: &ActorId) -> bool {
        self.closings.contains_key(id)
    }

    /// Completed question/answer exchanges, oldest first.
    pub fn exchanges(&self) -> Vec<QuestionExchange<'_>> {
        self.exchanges
            .iter()
            .map(|&(q, a)| QuestionExchange {
                question: &self.history[q],
                answer: &self.history[a],
            })
            .collect()
    }

    /// Append a record and update the derived indices. Returns its position.
    ///
    /// An `answer` record joins the exchange index when the record right
    /// before it is a question aimed at the answering speaker (and, if the
    /// answer names a target, asked by that target).
    pub fn append(&mut self, record: UtteranceRecord) -> usize {
        let idx = self.history.len();

        match record.task_type {
            TaskType::Opening => {
                self.openings.insert(record.speaker.clone(), idx);
            }
            TaskType::Closing => {
                self.closings.insert(record.speaker.clone(), idx);
            }
            TaskType::Answer => {
                if let Some(question) = self.history.last() {
                    let aimed_at_answerer = question.task_type == TaskType::Question
                        && question.target.as_ref() == Some(&record.speaker);
                    let answers_questioner = record
                        .target
                        .as_ref()
                        .map_or(true, |t| *t == question.speaker);
                    if aimed_at_answerer && answers_questioner {
                        self.exchanges.push((idx - 1, idx));
                    }
                }
            }
            TaskType::Question | TaskType::Rebuttal | TaskType::FreeDebate => {}
        }

        self.history.push(record);
        debug_assert!(self.projections_consistent());
        idx
    }

    /// Records `speaker` may see before producing a `task_type` turn.
    ///
    /// Pure function of the current state.
    pub fn relevant_history(
        &self,
        speaker: &ActorId,
        task_type: TaskType,
    ) -> Vec<&UtteranceRecord> {
        match task_type {
            TaskType::Opening | TaskType::Rebuttal => Vec::new(),

            TaskType::Question => {
                let mut others: Vec<usize> = self
                    .openings
                    .iter()
                    .filter(|(id, _)| *id != speaker)
                    .map(|(_, &idx)| idx)
                    .collect();
                others.sort_unstable();
                others.into_iter().map(|idx| &self.history[idx]).collect()
            }

            TaskType::Answer => {
                let mut relevant: Vec<&UtteranceRecord> =
                    self.opening_of(speaker).into_iter().collect();
                if let Some(last) = self.history.last() {
                    if last.task_type == TaskType::Question {
                        relevant.push(last);
                    }
                }
                relevant
            }

            TaskType::Closing => {
                let mut relevant: Vec<&UtteranceRecord> =
                    self.opening_of(speaker).into_iter().collect();
                for exchange in self.exchanges() {
                    if exchange.involves(speaker) {
                        relevant.push(exchange.question);
                        relevant.push(exchange.answer);
                    }
                }
                relevant
            }

            TaskType::FreeDebate => {
                let start = self.history.len().saturating_sub(FREE_DEBATE_WINDOW);
                self.history[start..].iter().collect()
            }
        }
    }

    /// Whether every projected entry still points at a matching history
    /// record.
    pub fn projections_consistent(&self) -> bool {
        let keyed_ok = |index: &HashMap<ActorId, usize>, task_type: TaskType| {
            index.iter().all(|(id, &idx)| {
                self.history
                    .get(idx)
                    .is_some_and(|r| r.speaker == *id && r.task_type == task_type)
            })
        };

        let exchanges_ok = self.exchanges.iter().all(|&(q, a)| {
            match (self.history.get(q), self.history.get(a)) {
                (Some(question), Some(answer)) => {
                    a == q + 1
                        && question.task_type == TaskType::Question
                        && answer.task_type == TaskType::Answer
                        && question.target.as_ref() == Some(&answer.speaker)
                }
                _ => false,
            }
        });

        keyed_ok(&self.openings, TaskType::Opening)
            && keyed_ok(&self.closings, TaskType::Closing)
            && exchanges_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::state::Participant;
    use crate::persona::Persona;

    fn p(id: &str) -> Participant {
        Participant::new(ActorId::new(id), Persona::new(id, "persona"), "")
    }

    fn record(
        speaker: &str,
        content: &str,
        task_type: TaskType,
        target: Option<&str>,
    ) -> UtteranceRecord {
        let phase = match task_type {
            TaskType::Opening => Phase::Opening,
            TaskType::Question | TaskType::Answer => Phase::Questioning,
            TaskType::Closing => Phase::Closing,
            TaskType::Rebuttal | TaskType::FreeDebate => Phase::FreeDebate,
        };
        UtteranceRecord::new(&p(speaker), content, phase, task_type)
            .with_target(target.map(ActorId::new))
    }

    fn id(s: &str) -> ActorId {
        ActorId::new(s)
    }

    fn contents(records: &[&UtteranceRecord]) -> Vec<String> {
        records.iter().map(|r| r.content.clone()).collect()
    }

    #[test]
    fn test_opening_sees_nothing() {
        let mut ledger = TurnLedger::new("topic");
        assert!(ledger.relevant_history(&id("a"), TaskType::Opening).is_empty());
        ledger.append(record("a", "A opens", TaskType::Opening, None));
        ledger.append(record("b", "B opens", TaskType::Opening, None));
        assert!(ledger.relevant_history(&id("c"), TaskType::Opening).is_empty());
    }

    #[test]
    fn test_question_sees_other_openings_in_order() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "A opens", TaskType::Opening, None));
        ledger.append(record("b", "B opens", TaskType::Opening, None));
        ledger.append(record("c", "C opens", TaskType::Opening, None));

        let seen = ledger.relevant_history(&id("b"), TaskType::Question);
        assert_eq!(contents(&seen), vec!["A opens", "C opens"]);
    }

    #[test]
    fn test_answer_sees_own_opening_and_pending_question() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "A opens", TaskType::Opening, None));
        ledger.append(record("b", "B opens", TaskType::Opening, None));
        ledger.append(record("a", "Why, B?", TaskType::Question, Some("b")));

        let seen = ledger.relevant_history(&id("b"), TaskType::Answer);
        assert_eq!(contents(&seen), vec!["B opens", "Why, B?"]);
    }

    #[test]
    fn test_answer_ignores_non_question_tail() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("b", "B opens", TaskType::Opening, None));
        ledger.append(record("a", "Why, B?", TaskType::Question, Some("b")));
        ledger.append(record("c", "an aside", TaskType::FreeDebate, None));

        let seen = ledger.relevant_history(&id("b"), TaskType::Answer);
        assert_eq!(contents(&seen), vec!["B opens"]);
    }

    #[test]
    fn test_answer_pairs_into_exchange() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "Why, B?", TaskType::Question, Some("b")));
        ledger.append(record("b", "Because.", TaskType::Answer, Some("a")));

        let exchanges = ledger.exchanges();
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].questioner(), &id("a"));
        assert_eq!(exchanges[0].answerer(), &id("b"));
    }

    #[test]
    fn test_unrelated_answer_is_not_paired() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "Why, B?", TaskType::Question, Some("b")));
        ledger.append(record("c", "I'll answer", TaskType::Answer, Some("a")));
        assert!(ledger.exchanges().is_empty());

        ledger.append(record("a", "Why, B?", TaskType::Question, Some("b")));
        ledger.append(record("b", "To C", TaskType::Answer, Some("c")));
        assert!(ledger.exchanges().is_empty());
    }

    #[test]
    fn test_answer_without_target_pairs_with_question_to_speaker() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "Why, B?", TaskType::Question, Some("b")));
        ledger.append(record("b", "Because.", TaskType::Answer, None));
        assert_eq!(ledger.exchanges().len(), 1);
    }

    #[test]
    fn test_closing_sees_own_opening_and_own_exchanges() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "A opens", TaskType::Opening, None));
        ledger.append(record("b", "B opens", TaskType::Opening, None));
        ledger.append(record("c", "C opens", TaskType::Opening, None));
        ledger.append(record("a", "Q a->b", TaskType::Question, Some("b")));
        ledger.append(record("b", "A b->a", TaskType::Answer, Some("a")));
        ledger.append(record("c", "Q c->b", TaskType::Question, Some("b")));
        ledger.append(record("b", "A b->c", TaskType::Answer, Some("c")));

        let seen = ledger.relevant_history(&id("a"), TaskType::Closing);
        assert_eq!(contents(&seen), vec!["A opens", "Q a->b", "A b->a"]);

        let seen = ledger.relevant_history(&id("b"), TaskType::Closing);
        assert_eq!(
            contents(&seen),
            vec!["B opens", "Q a->b", "A b->a", "Q c->b", "A b->c"]
        );
    }

    #[test]
    fn test_free_debate_window() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "1", TaskType::FreeDebate, None));
        ledger.append(record("b", "2", TaskType::FreeDebate, None));
        assert_eq!(
            contents(&ledger.relevant_history(&id("a"), TaskType::FreeDebate)),
            vec!["1", "2"]
        );

        ledger.append(record("c", "3", TaskType::FreeDebate, None));
        ledger.append(record("a", "4", TaskType::FreeDebate, None));
        assert_eq!(
            contents(&ledger.relevant_history(&id("z"), TaskType::FreeDebate)),
            vec!["2", "3", "4"]
        );
    }

    #[test]
    fn test_rebuttal_sees_nothing() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "A opens", TaskType::Opening, None));
        assert!(ledger.relevant_history(&id("b"), TaskType::Rebuttal).is_empty());
    }

    #[test]
    fn test_repeat_opening_replaces_projection() {
        let mut ledger = TurnLedger::new("topic");
        ledger.append(record("a", "first", TaskType::Opening, None));
        ledger.append(record("a", "second", TaskType::Opening, None));
        assert_eq!(ledger.opening_of(&id("a")).unwrap().content, "second");
        assert_eq!(ledger.len(), 2);
        assert!(ledger.projections_consistent());
    }

    #[test]
    fn test_closing_projection() {
        let mut ledger = TurnLedger::new("topic");
        assert!(!ledger.has_closed(&id("a")));
        ledger.append(record("a", "bye", TaskType::Closing, None));
        assert!(ledger.has_closed(&id("a")));
        assert_eq!(ledger.closing_of(&id("a")).unwrap().content, "bye");
    }

    #[test]
    fn test_set_phase() {
        let mut ledger = TurnLedger::new("topic");
        assert_eq!(ledger.phase(), Phase::Opening);
        ledger.set_phase(Phase::Closing);
        assert_eq!(ledger.phase(), Phase::Closing);
        assert_eq!(ledger.topic(), "topic");
    }
}
