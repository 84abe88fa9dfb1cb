// src/chat/completion.rs — Remote completion client

use std::sync::Arc;

use super::transcript::Turn;
use crate::infra::config::ModelConfig;
use crate::infra::errors::{BanterError, CompletionError};
use crate::provider::{ChatRequest, Message, ModelProvider};

/// Sampling settings passed through to the remote request unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    temperature: f64,
    max_output_tokens: u32,
}

impl CompletionOptions {
    pub fn new(temperature: f64, max_output_tokens: u32) -> Result<Self, BanterError> {
        if !(0.0..=2.0).contains(&temperature) {
            return Err(BanterError::Config(format!(
                "temperature must be within [0, 2], got {temperature}"
            )));
        }
        if max_output_tokens == 0 {
            return Err(BanterError::Config(
                "max_output_tokens must be positive".into(),
            ));
        }
        Ok(Self {
            temperature,
            max_output_tokens,
        })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self, BanterError> {
        Self::new(config.temperature, config.max_output_tokens)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            max_output_tokens: 500,
        }
    }
}

/// Handle to the remote generation service for one session.
///
/// The remote REST APIs are stateless, so every call resends the persona and
/// the prior exchanges. Cloning shares the underlying provider.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn ModelProvider>,
    model: String,
    system_instruction: String,
}

impl CompletionClient {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            system_instruction: system_instruction.into(),
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// Assemble the provider request: persona, prior exchanges, new message.
    pub fn build_request<'a, I>(
        &self,
        history: I,
        new_message: &str,
        options: &CompletionOptions,
    ) -> ChatRequest
    where
        I: IntoIterator<Item = (&'a Turn, &'a Turn)>,
    {
        let mut messages: Vec<Message> = history
            .into_iter()
            .flat_map(|(user, reply)| {
                [
                    Message::user(user.text()),
                    Message::assistant(reply.text()),
                ]
            })
            .collect();
        messages.push(Message::user(new_message));

        ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(options.max_output_tokens),
            temperature: Some(options.temperature),
            system: Some(self.system_instruction.clone()),
        }
    }

    /// Generate a reply. The text comes back exactly as the model produced it.
    pub async fn complete<'a, I>(
        &self,
        history: I,
        new_message: &str,
        options: &CompletionOptions,
    ) -> Result<String, CompletionError>
    where
        I: IntoIterator<Item = (&'a Turn, &'a Turn)>,
    {
        let request = self.build_request(history, new_message, options);
        self.send(request).await
    }

    /// Send a request built by [`CompletionClient::build_request`].
    pub async fn send(&self, request: ChatRequest) -> Result<String, CompletionError> {
        tracing::debug!(
            provider = self.provider.id(),
            model = %self.model,
            messages = request.messages.len(),
            "Requesting completion"
        );

        let response = self.provider.chat(request).await?;
        tracing::debug!(
            tokens = response.usage.total(),
            stop = ?response.stop_reason,
            "Completion received"
        );
        Ok(response.content)
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("provider", &self.provider.id())
            .field("model", &self.model)
            .finish()
    }
}
