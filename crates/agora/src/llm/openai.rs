//! OpenAI-compatible chat-completions client.

use std::time::Duration;

use async_trait::async_trait;
use dialogue::{ChatMessage, Completion, LanguageModel, LlmError, ToolCall, ToolSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ApiSource;

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolSpec]>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// One endpoint, no retries.
pub struct OpenAiCompatibleClient {
    source: ApiSource,
    url: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(source: ApiSource) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs.max(1)))
            .build()
            .map_err(|e| LlmError::Request(format!("failed to build HTTP client: {e}")))?;
        let url = format!(
            "{}{}",
            source.base_url.trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        );
        Ok(Self {
            source,
            url,
            client,
        })
    }

    pub fn source(&self) -> &ApiSource {
        &self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[ToolSpec]>,
    ) -> Result<Completion, LlmError> {
        let body = ChatRequest {
            model: &self.source.model,
            messages,
            temperature: self.source.temperature,
            tools: tools.filter(|t| !t.is_empty()),
        };

        let mut request = self.client.post(&self.url).json(&body);
        if !self.source.api_key.is_empty() {
            request = request.bearer_auth(&self.source.api_key);
        }

        debug!(
            source = %self.source.name,
            model = %self.source.model,
            messages = messages.len(),
            "Sending chat completion"
        );
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Request(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?
            .message;

        Ok(Completion {
            content: message.content.unwrap_or_default(),
            tool_calls: message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}
