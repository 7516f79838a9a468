//! Streaming client for the upstream OpenAI-compatible completion API.
//!
//! The relay talks to DashScope's compatible-mode endpoint through
//! `async-openai`. [`CompletionBackend`] is the seam the transport
//! adapters depend on, so tests substitute a scripted mock.

use std::pin::Pin;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionStreamOptions, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::config::UpstreamConfig;
use crate::error::{RelayError, Result};
use crate::models::{ChatMessage, Role};

/// Ordered sequence of model text fragments. Fragments carry no boundary
/// guarantees (a fragment may split mid-word); an `Err` item terminates
/// the sequence. Concatenating every `Ok` fragment of a successful stream
/// yields the final reply, whitespace-trim aside.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue one streaming completion for the given transcript.
    /// `key_override` replaces the configured credential for this call only.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        key_override: Option<&str>,
    ) -> Result<DeltaStream>;
}

pub struct OpenAiBackend {
    api_base: String,
    default_key: Option<String>,
    model: String,
    http: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(upstream: &UpstreamConfig) -> Self {
        // Connect timeout only; no overall deadline on the streaming body.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(upstream.connect_timeout_secs))
            .build()
            .unwrap_or_default();
        let default_key = Some(upstream.api_key.clone()).filter(|k| !k.is_empty());
        Self {
            api_base: upstream.api_base.clone(),
            default_key,
            model: upstream.model.clone(),
            http,
        }
    }

    fn resolve_key(&self, key_override: Option<&str>) -> Result<String> {
        key_override
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_key.clone())
            .ok_or(RelayError::MissingApiKey)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        key_override: Option<&str>,
    ) -> Result<DeltaStream> {
        let key = self.resolve_key(key_override)?;

        let config = OpenAIConfig::new()
            .with_api_base(&self.api_base)
            .with_api_key(key);
        // No retries: a single upstream failure is terminal for the turn.
        let client = Client::build(self.http.clone(), config, no_retry());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(to_openai_messages(messages)?)
            .stream(true)
            .stream_options(ChatCompletionStreamOptions {
                include_usage: true,
            })
            .build()?;

        tracing::debug!(model = %self.model, messages = messages.len(), "starting completion stream");

        let upstream = client.chat().create_stream(request).await?;
        let deltas = upstream.filter_map(|item| async move {
            match item {
                Ok(chunk) => chunk
                    .choices
                    .first()
                    .and_then(|choice| choice.delta.content.clone())
                    .filter(|fragment| !fragment.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(RelayError::from(e))),
            }
        });
        Ok(Box::pin(deltas))
    }
}

fn no_retry() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn to_openai_messages(messages: &[ChatMessage]) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages
        .iter()
        .map(|m| {
            Ok(match m.role {
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(m.content.as_str())
                    .build()?
                    .into(),
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(m.content.as_str())
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(m.content.as_str())
                    .build()?
                    .into(),
            })
        })
        .collect()
}
