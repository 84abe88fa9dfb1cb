// src/provider/google.rs — Google Generative AI (Gemini) provider

use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, ModelInfo, ModelProvider, Role, StopReason, TokenUsage};
use crate::infra::errors::CompletionError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GoogleProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_options(api_key, None, None)
    }

    pub fn with_options(
        api_key: String,
        base_url: Option<String>,
        timeout: Option<std::time::Duration>,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url
                .filter(|u| !u.trim().is_empty())
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: super::http_client(timeout),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The key travels in the `x-goog-api-key` header, never in the URL.
    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Build the Gemini request body from a ChatRequest.
    pub fn build_request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut contents: Vec<serde_json::Value> = Vec::new();

        for m in &request.messages {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "model",
                Role::System => continue, // carried by system_instruction
            };

            contents.push(serde_json::json!({
                "role": role,
                "parts": [{ "text": m.content }],
            }));
        }

        let mut body = serde_json::json!({
            "contents": contents,
        });

        if let Some(ref system) = request.system {
            body["system_instruction"] = serde_json::json!({
                "parts": [{ "text": system }],
            });
        }

        let mut gen_config = serde_json::json!({});
        if let Some(max_tokens) = request.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            gen_config["temperature"] = serde_json::json!(temp);
        }
        if gen_config != serde_json::json!({}) {
            body["generationConfig"] = gen_config;
        }

        body
    }

    /// Pull text, usage and finish reason out of a `generateContent` response.
    pub fn parse_response(resp: &serde_json::Value) -> Result<ChatResponse, CompletionError> {
        if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
            return Err(CompletionError::EmptyReply {
                provider: "google".into(),
                reason: reason.to_string(),
            });
        }

        let Some(candidate) = resp["candidates"].as_array().and_then(|c| c.first()) else {
            return Err(CompletionError::Malformed {
                provider: "google".into(),
                message: "response has no candidates".into(),
            });
        };

        let finish = candidate["finishReason"].as_str().unwrap_or("UNKNOWN");
        let stop_reason = match finish {
            "STOP" => StopReason::EndTurn,
            "MAX_TOKENS" => StopReason::MaxTokens,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => StopReason::Safety,
            _ => StopReason::Unknown,
        };

        let content: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .concat()
            })
            .unwrap_or_default();

        if content.is_empty() {
            return Err(CompletionError::EmptyReply {
                provider: "google".into(),
                reason: finish.to_string(),
            });
        }

        let usage = TokenUsage {
            input_tokens: super::token_count(&resp["usageMetadata"]["promptTokenCount"]),
            output_tokens: super::token_count(&resp["usageMetadata"]["candidatesTokenCount"]),
        };

        Ok(ChatResponse {
            content,
            usage,
            stop_reason,
        })
    }
}

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google"
    }

    fn models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gemini-2.5-pro".into(),
                name: "Gemini 2.5 Pro".into(),
                context_window: 1_048_576,
                max_output_tokens: 65_536,
            },
            ModelInfo {
                id: "gemini-2.5-flash".into(),
                name: "Gemini 2.5 Flash".into(),
                context_window: 1_048_576,
                max_output_tokens: 65_536,
            },
            ModelInfo {
                id: "gemini-2.0-flash".into(),
                name: "Gemini 2.0 Flash".into(),
                context_window: 1_048_576,
                max_output_tokens: 8_192,
            },
        ]
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, CompletionError> {
        let body = self.build_request_body(&request);

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::from_transport("google", &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status("google", status, error_body));
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| CompletionError::Malformed {
                provider: "google".into(),
                message: format!("Failed to parse response: {}", e),
            })?;

        Self::parse_response(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gemini-2.0-flash".into(),
            messages: vec![
                Message::user("Hi"),
                Message::assistant("Hello there"),
                Message::user("How are you?"),
            ],
            max_tokens: Some(500),
            temperature: Some(0.8),
            system: Some("Be kind.".into()),
        }
    }

    #[test]
    fn test_body_roles_and_order() {
        let p = GoogleProvider::new("k".into());
        let body = p.build_request_body(&request());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "How are you?");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "Be kind.");
    }

    #[test]
    fn test_body_passes_generation_config_unchanged() {
        let p = GoogleProvider::new("k".into());
        let body = p.build_request_body(&request());
        assert_eq!(body["generationConfig"]["temperature"].as_f64(), Some(0.8));
        assert_eq!(
            body["generationConfig"]["maxOutputTokens"].as_u64(),
            Some(500)
        );
    }

    #[test]
    fn test_body_omits_empty_generation_config() {
        let p = GoogleProvider::new("k".into());
        let mut req = request();
        req.max_tokens = None;
        req.temperature = None;
        let body = p.build_request_body(&req);
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_system_messages_not_in_contents() {
        let p = GoogleProvider::new("k".into());
        let mut req = request();
        req.messages.insert(0, Message::system("ignored here"));
        let body = p.build_request_body(&req);
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_api_key_never_in_body_or_url() {
        let p = GoogleProvider::new("secret-key-123".into());
        let body = p.build_request_body(&request());
        assert!(!body.to_string().contains("secret-key-123"));
        assert!(!p.endpoint("gemini-2.0-flash").contains("secret-key-123"));
    }

    #[test]
    fn test_base_url_override_trims_slash() {
        let p = GoogleProvider::with_options("k".into(), Some("http://localhost:9/v1/".into()), None);
        assert_eq!(p.base_url(), "http://localhost:9/v1");
        assert_eq!(
            p.endpoint("m"),
            "http://localhost:9/v1/models/m:generateContent"
        );
        let p = GoogleProvider::with_options("k".into(), Some("  ".into()), None);
        assert_eq!(p.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_parse_response_text_unmodified() {
        let resp = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "  Hello, " }, { "text": "friend!\n" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 4 }
        });
        let r = GoogleProvider::parse_response(&resp).unwrap();
        assert_eq!(r.content, "  Hello, friend!\n");
        assert_eq!(r.stop_reason, StopReason::EndTurn);
        assert_eq!(r.usage.total(), 16);
    }

    #[test]
    fn test_parse_response_huge_usage_is_clamped() {
        let resp = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "ok" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 5_000_000_000u64, "candidatesTokenCount": 3 }
        });
        let r = GoogleProvider::parse_response(&resp).unwrap();
        assert_eq!(r.usage.input_tokens, u32::MAX);
        assert_eq!(r.usage.total(), u32::MAX);
    }

    #[test]
    fn test_parse_response_blocked_prompt() {
        let resp = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = GoogleProvider::parse_response(&resp).unwrap_err();
        assert!(matches!(err, CompletionError::EmptyReply { ref reason, .. } if reason == "SAFETY"));
    }

    #[test]
    fn test_parse_response_no_candidates() {
        let err = GoogleProvider::parse_response(&serde_json::json!({})).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_parse_response_empty_text() {
        let resp = serde_json::json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
        });
        let err = GoogleProvider::parse_response(&resp).unwrap_err();
        assert_eq!(err.kind(), "empty_reply");
    }
}
