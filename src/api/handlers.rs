// src/api/handlers.rs

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};

use tokio::sync::OwnedMutexGuard;

use crate::api::{cookie, types::*, ApiState};
use crate::chat::{Session, SessionHandle, Submission};
use crate::infra::errors::BanterError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Run one round on its own task. A client that disconnects mid-round drops
/// the handler, not the round, so the reply still lands in the transcript.
async fn run_round(
    mut session: OwnedMutexGuard<Session>,
    text: String,
) -> Result<(OwnedMutexGuard<Session>, Result<Submission, BanterError>), tokio::task::JoinError> {
    tokio::spawn(async move {
        let outcome = session.submit(&text).await;
        (session, outcome)
    })
    .await
}

fn find_session(state: &ApiState, id: &str) -> Result<SessionHandle, ApiError> {
    state.registry.get(id).ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            BanterError::SessionNotFound { id: id.into() }.to_string(),
        )
    })
}

/// GET / — Render the chat page for the caller's session.
///
/// Reading never creates a session; that waits for the first message.
/// A session busy with a round gets a self-refreshing placeholder instead
/// of waiting for the remote call.
pub async fn index(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let handle = cookie::session_id(&headers).and_then(|id| state.registry.get(&id));

    let rendered = match handle {
        Some(handle) => {
            let html = match handle.try_lock() {
                Ok(session) => state.page.render(Some(session.transcript())),
                Err(_) => state.page.render_pending(),
            };
            html
        }
        None => state.page.render(None),
    };

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render chat page: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

/// POST /chat — Form submission from the chat page, then back to `/`.
pub async fn submit_form(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    if form.message.trim().is_empty() {
        return Redirect::to("/").into_response();
    }

    let existing = cookie::session_id(&headers);
    let (id, handle, created) = state.registry.get_or_create(existing.as_deref());

    let Ok(session) = handle.try_lock_owned() else {
        return (
            StatusCode::CONFLICT,
            "Still working on your previous message.",
        )
            .into_response();
    };

    match run_round(session, form.message).await {
        Ok((_, Ok(_))) => {}
        Ok((_, Err(e))) => tracing::warn!(session = %id, "Form submission rejected: {e}"),
        Err(e) => tracing::error!(session = %id, "Round task failed: {e}"),
    }

    let mut response = Redirect::to("/").into_response();
    if created {
        if let Some(value) = cookie::issue(&id) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// POST /api/v1/sessions — Start a new session.
pub async fn create_session(
    State(state): State<ApiState>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let (session_id, handle) = state.registry.create();
    let session_state = handle.lock().await.state();
    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id,
            state: session_state,
        }),
    )
}

/// GET /api/v1/sessions/:id — State and transcript. 409 while a round is running.
pub async fn get_session(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = find_session(&state, &id)?;
    let Ok(session) = handle.try_lock() else {
        return Err(api_error(
            StatusCode::CONFLICT,
            "A message for this session is still being processed",
        ));
    };
    Ok(Json(SessionView {
        session_id: id,
        state: session.state(),
        turns: session.transcript().all().cloned().collect(),
    }))
}

/// POST /api/v1/sessions/:id/messages — Submit one message and wait for the reply.
pub async fn post_message(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let handle = find_session(&state, &id)?;

    let Ok(session) = handle.try_lock_owned() else {
        return Err(api_error(
            StatusCode::CONFLICT,
            "A message for this session is already being processed",
        ));
    };

    let (session, outcome) = run_round(session, body.text).await.map_err(|e| {
        tracing::error!(session = %id, "Round task failed: {e}");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error while handling the message",
        )
    })?;

    let submission = match outcome {
        Ok(s) => s,
        Err(BanterError::SessionClosed) => {
            return Err(api_error(StatusCode::GONE, "Session is closed"));
        }
        Err(e) => {
            tracing::error!(session = %id, "Submission failed: {e}");
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal error while handling the message",
            ));
        }
    };

    let error_kind = match &submission {
        Submission::Fallback { error, .. } => Some(error.kind().to_string()),
        _ => None,
    };

    Ok(Json(MessageResponse {
        session_id: id,
        ignored: submission == Submission::Ignored,
        fallback: submission.is_fallback(),
        reply: session.reply(&submission).cloned(),
        error_kind,
        transcript_len: session.transcript().len(),
    }))
}

/// DELETE /api/v1/sessions/:id — Close and forget a session.
pub async fn delete_session(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.registry.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(api_error(
            StatusCode::NOT_FOUND,
            BanterError::SessionNotFound { id }.to_string(),
        ))
    }
}

/// GET /api/v1/health — Simple health check.
pub async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len(),
    }))
}
