// src/api/mod.rs — Web front-end: chat page plus a small JSON API

pub mod cookie;
pub mod handlers;
pub mod page;
pub mod types;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::chat::SessionRegistry;
use crate::infra::config::ServerConfig;
use page::PageRenderer;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub registry: SessionRegistry,
    pub page: Arc<PageRenderer>,
}

impl ApiState {
    pub fn new(registry: SessionRegistry, page: PageRenderer) -> Self {
        Self {
            registry,
            page: Arc::new(page),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let mut allowed: Vec<HeaderValue> = vec![
        HeaderValue::from_static("http://localhost:8501"),
        HeaderValue::from_static("http://127.0.0.1:8501"),
    ];
    for origin in origins {
        match origin.parse::<HeaderValue>() {
            Ok(v) => allowed.push(v),
            Err(_) => tracing::warn!("Ignoring invalid CORS origin '{origin}'"),
        }
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Build the axum router with the page and API routes.
pub fn build_router(state: ApiState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/chat", post(handlers::submit_form))
        .route("/api/v1/sessions", post(handlers::create_session))
        .route(
            "/api/v1/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/api/v1/sessions/{id}/messages", post(handlers::post_message))
        .route("/api/v1/health", get(handlers::health))
        .layer(cors_layer(&config.cors_origins))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn start_server(config: &ServerConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let router = build_router(state, config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Chat page at http://{addr}/");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{CompletionClient, CompletionOptions};
    use crate::infra::errors::CompletionError;
    use crate::provider::{ChatRequest, ChatResponse, ModelInfo, ModelProvider, StopReason, TokenUsage};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    struct CannedProvider;

    #[async_trait]
    impl ModelProvider for CannedProvider {
        fn id(&self) -> &str {
            "canned"
        }

        fn name(&self) -> &str {
            "Canned"
        }

        fn models(&self) -> Vec<ModelInfo> {
            Vec::new()
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, CompletionError> {
            let last = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");
            if last == "slow" {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if last == "break" {
                return Err(CompletionError::Timeout {
                    provider: "canned".into(),
                });
            }
            Ok(ChatResponse {
                content: format!("You said {} thing(s)", request.messages.len()),
                usage: TokenUsage::default(),
                stop_reason: StopReason::EndTurn,
            })
        }
    }

    fn test_state() -> ApiState {
        let client = CompletionClient::new(Arc::new(CannedProvider), "canned-1", "persona");
        let registry = SessionRegistry::new(
            client,
            CompletionOptions::default(),
            crate::infra::config::DEFAULT_FALLBACK_MESSAGE,
            Duration::from_secs(600),
        );
        ApiState::new(registry, PageRenderer::new("Banter", "canned-1").unwrap())
    }

    fn app(state: ApiState) -> Router {
        build_router(state, &ServerConfig::default())
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let req = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let resp = app(test_state()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["sessions"], 0);
    }

    #[tokio::test]
    async fn test_index_without_cookie_creates_nothing() {
        let state = test_state();
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(resp).await.contains("Say hello"));
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_form_round_trip_sets_cookie_and_renders() {
        let state = test_state();
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("message=Hello"))
            .unwrap();
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        assert_eq!(state.registry.len(), 1);

        let req = Request::builder()
            .uri("/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let resp = app(state).oneshot(req).await.unwrap();
        let html = body_text(resp).await;
        assert!(html.contains("Hello"));
        assert!(html.contains("You said 1 thing(s)"));
    }

    #[tokio::test]
    async fn test_blank_form_is_ignored() {
        let state = test_state();
        let req = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("message=++"))
            .unwrap();
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_json_session_flow() {
        let state = test_state();

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/sessions")
            .body(Body::empty())
            .unwrap();
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created = body_json(resp).await;
        assert_eq!(created["state"], "empty");
        let id = created["session_id"].as_str().unwrap().to_string();

        let uri = format!("/api/v1/sessions/{id}/messages");
        let resp = app(state.clone())
            .oneshot(post_json(&uri, serde_json::json!({ "text": "Hello" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let msg = body_json(resp).await;
        assert_eq!(msg["fallback"], false);
        assert_eq!(msg["ignored"], false);
        assert_eq!(msg["transcript_len"], 2);
        assert_eq!(msg["reply"]["speaker"], "assistant");

        let resp = app(state.clone())
            .oneshot(post_json(&uri, serde_json::json!({ "text": "break" })))
            .await
            .unwrap();
        let msg = body_json(resp).await;
        assert_eq!(msg["fallback"], true);
        assert_eq!(msg["error_kind"], "timeout");
        assert_eq!(
            msg["reply"]["text"],
            crate::infra::config::DEFAULT_FALLBACK_MESSAGE
        );

        let req = Request::builder()
            .uri(format!("/api/v1/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let view = body_json(app(state).oneshot(req).await.unwrap()).await;
        assert_eq!(view["state"], "awaiting_input");
        let speakers: Vec<&str> = view["turns"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["speaker"].as_str().unwrap())
            .collect();
        assert_eq!(speakers, vec!["user", "assistant", "user", "assistant"]);
    }

    #[tokio::test]
    async fn test_blank_json_message_ignored() {
        let state = test_state();
        let (id, _) = state.registry.create();
        let uri = format!("/api/v1/sessions/{id}/messages");
        let resp = app(state)
            .oneshot(post_json(&uri, serde_json::json!({ "text": "   " })))
            .await
            .unwrap();
        let msg = body_json(resp).await;
        assert_eq!(msg["ignored"], true);
        assert_eq!(msg["transcript_len"], 0);
        assert!(msg["reply"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_session_404() {
        let resp = app(test_state())
            .oneshot(post_json(
                "/api/v1/sessions/nope/messages",
                serde_json::json!({ "text": "hi" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_busy_session_409() {
        let state = test_state();
        let (id, handle) = state.registry.create();
        let _guard = handle.lock().await;
        let uri = format!("/api/v1/sessions/{id}/messages");
        let resp = app(state)
            .oneshot(post_json(&uri, serde_json::json!({ "text": "hi" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let state = test_state();
        let (id, _) = state.registry.create();
        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/sessions/{id}"))
                .body(Body::empty())
                .unwrap()
        };
        let resp = app(state.clone()).oneshot(delete()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = app(state.clone()).oneshot(delete()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn test_index_for_busy_session_does_not_wait() {
        let state = test_state();
        let (id, handle) = state.registry.create();
        let _guard = handle.lock().await;

        let req = Request::builder()
            .uri("/")
            .header(header::COOKIE, format!("{}={id}", cookie::SESSION_COOKIE))
            .body(Body::empty())
            .unwrap();
        let resp = tokio::time::timeout(Duration::from_secs(1), app(state).oneshot(req))
            .await
            .expect("page render must not wait for the round")
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Still replying"));
    }

    #[tokio::test]
    async fn test_session_view_busy_409() {
        let state = test_state();
        let (id, handle) = state.registry.create();
        let _guard = handle.lock().await;
        let req = Request::builder()
            .uri(format!("/api/v1/sessions/{id}"))
            .body(Body::empty())
            .unwrap();
        let resp = app(state).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_round_completes_after_client_goes_away() {
        let state = test_state();
        let (id, handle) = state.registry.create();
        let uri = format!("/api/v1/sessions/{id}/messages");

        let dropped = tokio::time::timeout(
            Duration::from_millis(10),
            app(state).oneshot(post_json(&uri, serde_json::json!({ "text": "slow" }))),
        )
        .await;
        assert!(dropped.is_err());

        let session = handle.lock().await;
        let turns: Vec<&crate::chat::Turn> = session.transcript().all().collect();
        assert_eq!(turns.len(), 2);
        assert!(!turns[1].is_fallback());
        assert_eq!(turns[1].text(), "You said 1 thing(s)");
    }
}
