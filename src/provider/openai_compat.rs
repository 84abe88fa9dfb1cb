// src/provider/openai_compat.rs — Generic OpenAI-compatible provider
//
// For operators pointing banter at Groq, Together, OpenRouter, a self-hosted
// gateway, or anything else that speaks `/chat/completions`.

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelInfo, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::CompletionError;

pub struct OpenAICompatProvider {
    id_str: String,
    api_key: String,
    base_url: String,
    default_model: String,
    client: reqwest::Client,
}

impl OpenAICompatProvider {
    pub fn new(
        id: impl Into<String>,
        api_key: String,
        base_url: String,
        default_model: String,
        timeout: Option<std::time::Duration>,
    ) -> Self {
        Self {
            id_str: id.into(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model,
            client: super::http_client(timeout),
        }
    }

    pub fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        for m in &request.messages {
            messages.push(serde_json::json!({
                "role": match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": m.content,
            }));
        }

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": messages,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    pub fn parse_response(
        provider: &str,
        resp: &serde_json::Value,
    ) -> Result<ChatResponse, CompletionError> {
        let Some(choice) = resp["choices"].as_array().and_then(|c| c.first()) else {
            return Err(CompletionError::Malformed {
                provider: provider.into(),
                message: "response has no choices".into(),
            });
        };

        let finish = choice["finish_reason"].as_str().unwrap_or("unknown");
        let content = choice["message"]["content"].as_str().unwrap_or("");
        if content.is_empty() {
            return Err(CompletionError::EmptyReply {
                provider: provider.into(),
                reason: finish.to_string(),
            });
        }

        Ok(ChatResponse {
            content: content.to_string(),
            usage: TokenUsage {
                input_tokens: super::token_count(&resp["usage"]["prompt_tokens"]),
                output_tokens: super::token_count(&resp["usage"]["completion_tokens"]),
            },
            stop_reason: match finish {
                "stop" => StopReason::EndTurn,
                "length" => StopReason::MaxTokens,
                "content_filter" => StopReason::Safety,
                _ => StopReason::Unknown,
            },
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    fn id(&self) -> &str {
        &self.id_str
    }

    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: self.default_model.clone(),
            name: self.default_model.clone(),
            context_window: 128_000,
            max_output_tokens: 16_384,
        }]
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, CompletionError> {
        let body = self.build_request_body(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::from_transport(&self.id_str, &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(&self.id_str, status, error_body));
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| CompletionError::Malformed {
                provider: self.id_str.clone(),
                message: e.to_string(),
            })?;

        Self::parse_response(&self.id_str, &resp)
    }
}
