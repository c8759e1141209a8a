//! Language model implementations backed by OpenAI-compatible HTTP APIs.

pub mod fallback;
pub mod openai;

pub use fallback::{FallbackModel, SourceStats, DEFAULT_RETRY_WAIT};
pub use openai::OpenAiCompatibleClient;
