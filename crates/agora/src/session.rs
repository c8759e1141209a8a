//! Wiring from parsed arguments and config to a running session.

use std::sync::Arc;

use anyhow::{Context, Result};
use dialogue::{
    DebateEngine, DebateOutcome, DialogueError, DiscussionOutcome, LanguageModel, Moderator,
    NullSink, SessionStatus, TranscriptSink, UtteranceRecord,
};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{DebateArgs, DiscussArgs, OutputArgs};
use crate::config::{AgoraConfig, ModelConfig};
use crate::llm::FallbackModel;
use crate::personas::PersonaCatalog;
use crate::sink::{ConsoleSink, FanoutSink, JsonlSink};

pub fn build_model(config: &ModelConfig) -> Result<Arc<dyn LanguageModel>> {
    let model = FallbackModel::from_config(config).context("Failed to build model clients")?;
    info!(sources = ?model.source_names(), "Model sources ready");
    Ok(Arc::new(model))
}

/// Console output unless `--json`, plus a JSONL file when requested.
pub fn build_sink(output: &OutputArgs, show_decisions: bool) -> Result<Arc<dyn TranscriptSink>> {
    let mut fanout = FanoutSink::new();
    if !output.json {
        fanout = fanout.push(ConsoleSink::new(show_decisions));
    }
    if let Some(path) = &output.transcript {
        let sink = JsonlSink::create(path)
            .with_context(|| format!("Failed to open transcript {}", path.display()))?;
        fanout = fanout.push(sink);
    }
    if fanout.is_empty() {
        return Ok(Arc::new(NullSink));
    }
    Ok(Arc::new(fanout))
}

pub fn catalog(config: &AgoraConfig) -> PersonaCatalog {
    PersonaCatalog::builtin().with_overrides(&config.personas)
}

/// Why a session did not produce an outcome.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Arguments, config or personas were rejected before any turn ran.
    #[error(transparent)]
    Setup(#[from] anyhow::Error),

    /// The session started, then failed or was cancelled. `records` holds
    /// everything appended before it stopped.
    #[error("session {status} after {} turns", .records.len())]
    Stopped {
        status: SessionStatus,
        records: Vec<UtteranceRecord>,
        #[source]
        error: DialogueError,
    },
}

impl SessionError {
    fn setup(error: DialogueError) -> Self {
        Self::Setup(error.into())
    }

    /// Records produced before the session stopped. Empty for setup errors.
    pub fn records(&self) -> &[UtteranceRecord] {
        match self {
            Self::Setup(_) => &[],
            Self::Stopped { records, .. } => records,
        }
    }
}

/// What `--json` prints for a session that stopped early.
#[derive(Debug, Serialize)]
pub struct PartialOutcome<'a> {
    pub status: SessionStatus,
    pub error: String,
    pub turns: usize,
    pub records: &'a [UtteranceRecord],
}

impl<'a> PartialOutcome<'a> {
    pub fn from_error(err: &'a SessionError) -> Option<Self> {
        match err {
            SessionError::Setup(_) => None,
            SessionError::Stopped {
                status,
                records,
                error,
            } => Some(Self {
                status: *status,
                error: error.to_string(),
                turns: records.len(),
                records,
            }),
        }
    }
}

pub async fn run_debate(
    args: &DebateArgs,
    config: &AgoraConfig,
    model: Arc<dyn LanguageModel>,
    sink: Arc<dyn TranscriptSink>,
    cancel: CancellationToken,
) -> Result<DebateOutcome, SessionError> {
    let debate = args.merge(config.debate.clone())?;
    let personas = catalog(config);
    let mut engine = DebateEngine::new(debate, model, &personas)
        .map_err(SessionError::setup)?
        .with_sink(sink)
        .with_cancellation(cancel);
    engine.run().await.map_err(|error| SessionError::Stopped {
        status: engine.status(),
        records: engine.ledger().history().to_vec(),
        error,
    })
}

pub async fn run_discussion(
    args: &DiscussArgs,
    config: &AgoraConfig,
    model: Arc<dyn LanguageModel>,
    sink: Arc<dyn TranscriptSink>,
    cancel: CancellationToken,
) -> Result<DiscussionOutcome, SessionError> {
    let discussion = args.merge(config.discussion.clone())?;
    let personas = catalog(config);
    let mut moderator = Moderator::new(discussion, model, &personas)
        .map_err(SessionError::setup)?
        .with_sink(sink)
        .with_cancellation(cancel);
    moderator.run().await.map_err(|error| SessionError::Stopped {
        status: moderator.status(),
        records: moderator.ledger().history().to_vec(),
        error,
    })
}

/// One line per persona: `id  Display Name`.
pub fn persona_listing(catalog: &PersonaCatalog) -> String {
    catalog
        .iter()
        .map(|(id, persona)| format!("{:<10} {}", id.as_str(), persona.display_name))
        .collect::<Vec<_>>()
        .join("\n")
}
