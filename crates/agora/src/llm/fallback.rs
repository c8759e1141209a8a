//! Multi-source language model with retries and fallback.
//!
//! ```text
//! invoke
//!   ├─ source 1 (lowest priority value): up to 1 + max_retries attempts
//!   ├─ source 2 ...
//!   └─ all failed ─┬─ fallback_message set → Completion(fallback_message)
//!                  └─ otherwise            → LlmError::Exhausted
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dialogue::{ChatMessage, Completion, LanguageModel, LlmError, ToolSpec};
use serde::Serialize;
use tracing::{debug, error, warn};

use super::openai::OpenAiCompatibleClient;
use crate::config::ModelConfig;

/// Pause between attempts against the same source.
pub const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Per-source call counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub name: String,
    pub successes: u64,
    pub failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

struct Source {
    name: String,
    max_retries: u32,
    model: Arc<dyn LanguageModel>,
}

pub struct FallbackModel {
    sources: Vec<Source>,
    fallback_message: Option<String>,
    retry_wait: Duration,
    stats: Mutex<Vec<SourceStats>>,
}

impl FallbackModel {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            fallback_message: None,
            retry_wait: DEFAULT_RETRY_WAIT,
            stats: Mutex::new(Vec::new()),
        }
    }

    /// Build one HTTP client per configured source, ordered by priority.
    pub fn from_config(config: &ModelConfig) -> Result<Self, LlmError> {
        let mut sources = config.sources.clone();
        sources.sort_by_key(|s| s.priority);

        let mut model = Self::new();
        for source in sources {
            let name = source.name.clone();
            let max_retries = source.max_retries;
            let client = OpenAiCompatibleClient::new(source)?;
            model = model.add_source(&name, max_retries, Arc::new(client));
        }
        if let Some(message) = &config.fallback_message {
            model = model.with_fallback_message(message.clone());
        }
        Ok(model)
    }

    /// Append a source. Sources are tried in the order they were added.
    pub fn add_source(
        mut self,
        name: &str,
        max_retries: u32,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        self.sources.push(Source {
            name: name.to_string(),
            max_retries,
            model,
        });
        self.stats
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SourceStats {
                name: name.to_string(),
                ..Default::default()
            });
        self
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = Some(message.into());
        self
    }

    pub fn with_retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }

    /// Snapshot of per-source counters, in source order.
    pub fn stats(&self) -> Vec<SourceStats> {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, idx: usize, outcome: Result<(), &LlmError>) {
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = stats.get_mut(idx) {
            match outcome {
                Ok(()) => entry.successes += 1,
                Err(e) => {
                    entry.failures += 1;
                    entry.last_error = Some(e.to_string());
                }
            }
        }
    }
}

impl Default for FallbackModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Client errors other than rate limiting will fail the same way again.
fn is_retryable(error: &LlmError) -> bool {
    match error {
        LlmError::Status { status, .. } => *status == 429 || *status >= 500,
        LlmError::Parse(_) => false,
        _ => true,
    }
}

#[async_trait]
impl LanguageModel for FallbackModel {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<Completion, LlmError> {
        let mut attempts = 0u32;
        let mut last_error: Option<LlmError> = None;

        for (idx, source) in self.sources.iter().enumerate() {
            let mut attempt = 0;
            loop {
                attempts += 1;
                match source.model.invoke(messages, tools).await {
                    Ok(completion) => {
                        self.record(idx, Ok(()));
                        debug!(source = %source.name, attempt, "Model call succeeded");
                        return Ok(completion);
                    }
                    Err(e) => {
                        let retry = attempt < source.max_retries && is_retryable(&e);
                        warn!(
                            source = %source.name,
                            attempt,
                            retry,
                            error = %e,
                            "Model call failed"
                        );
                        if !retry {
                            self.record(idx, Err(&e));
                            last_error = Some(e);
                            break;
                        }
                        attempt += 1;
                        tokio::time::sleep(self.retry_wait).await;
                    }
                }
            }
        }

        let last = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no sources configured".to_string());
        match &self.fallback_message {
            Some(message) => {
                error!(attempts, last = %last, "All model sources failed, using fallback message");
                Ok(Completion::text(message.clone()))
            }
            None => Err(LlmError::Exhausted { attempts, last }),
        }
    }
}
