// src/chat/session.rs — One user's conversation: transcript + remote handle

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::completion::{CompletionClient, CompletionOptions};
use super::transcript::{Speaker, Transcript, Turn, TurnId};
use crate::infra::config::DEFAULT_FALLBACK_MESSAGE;
use crate::infra::errors::{BanterError, CompletionError};

/// Lifecycle of a session.
///
/// `Empty → AwaitingInput → Generating → AwaitingInput → … → Closed`.
/// `Empty` lasts until the first non-blank submission. `Generating` always
/// exits back to `AwaitingInput`: on success, on failure, and when the
/// round's future is dropped mid-call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    AwaitingInput,
    Generating,
    Closed,
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Blank input; nothing was appended.
    Ignored,
    /// The model answered; `reply` is the new assistant turn.
    Replied { prompt: TurnId, reply: TurnId },
    /// The remote call failed and the fallback text was appended instead.
    Fallback {
        prompt: TurnId,
        reply: TurnId,
        error: CompletionError,
    },
}

impl Submission {
    pub fn reply_id(&self) -> Option<TurnId> {
        match self {
            Submission::Ignored => None,
            Submission::Replied { reply, .. } | Submission::Fallback { reply, .. } => Some(*reply),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Submission::Fallback { .. })
    }
}

#[derive(Debug)]
pub struct Session {
    id: String,
    transcript: Transcript,
    client: CompletionClient,
    options: CompletionOptions,
    fallback_message: String,
    state: SessionState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(client: CompletionClient, options: CompletionOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            transcript: Transcript::new(),
            client,
            options,
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
            state: SessionState::Empty,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_fallback_message(mut self, message: impl Into<String>) -> Self {
        self.fallback_message = message.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    pub fn fallback_message(&self) -> &str {
        &self.fallback_message
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn reply(&self, submission: &Submission) -> Option<&Turn> {
        submission.reply_id().and_then(|id| self.transcript.get(id))
    }

    /// Run one round: append the user turn, ask the model, append its reply
    /// (or the fallback text). `&mut self` keeps rounds strictly sequential.
    ///
    /// Cancel safe: dropping the returned future while the remote call is
    /// pending still appends the fallback turn and leaves `Generating`.
    pub async fn submit(&mut self, input: &str) -> Result<Submission, BanterError> {
        if self.state == SessionState::Closed {
            return Err(BanterError::SessionClosed);
        }
        if input.trim().is_empty() {
            return Ok(Submission::Ignored);
        }
        if self.state == SessionState::Empty {
            self.state = SessionState::AwaitingInput;
        }

        let prompt = self.transcript.append(Speaker::User, input);
        let request = self
            .client
            .build_request(self.transcript.exchanges(), input, &self.options);
        self.state = SessionState::Generating;
        self.updated_at = Utc::now();

        let round = Round {
            session: self,
            prompt,
            done: false,
        };
        let result = round.session.client.send(request).await;
        Ok(round.finish(result))
    }

    /// Terminal; later submissions fail with [`BanterError::SessionClosed`].
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            tracing::debug!(session = %self.id, turns = self.transcript.len(), "Session closed");
        }
        self.state = SessionState::Closed;
    }
}

/// A round between the user turn and its reply. Dropping it unfinished
/// appends the fallback turn, so a user turn is never left unanswered.
struct Round<'s> {
    session: &'s mut Session,
    prompt: TurnId,
    done: bool,
}

impl Round<'_> {
    fn finish(mut self, result: Result<String, CompletionError>) -> Submission {
        self.done = true;
        let prompt = self.prompt;
        let session = &mut *self.session;

        let submission = match result {
            Ok(text) => {
                let reply = session.transcript.append(Speaker::Assistant, text);
                tracing::debug!(session = %session.id, turn = %reply, "Reply appended");
                Submission::Replied { prompt, reply }
            }
            Err(error) => {
                tracing::warn!(
                    session = %session.id,
                    kind = error.kind(),
                    transient = error.is_transient(),
                    "Completion failed, using fallback reply: {error}"
                );
                let reply = session
                    .transcript
                    .append_fallback(session.fallback_message.clone());
                Submission::Fallback {
                    prompt,
                    reply,
                    error,
                }
            }
        };

        session.state = SessionState::AwaitingInput;
        session.updated_at = Utc::now();
        submission
    }
}

impl Drop for Round<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let session = &mut *self.session;
        tracing::warn!(
            session = %session.id,
            prompt = %self.prompt,
            "Round dropped before the reply arrived, using fallback reply"
        );
        session
            .transcript
            .append_fallback(session.fallback_message.clone());
        session.state = SessionState::AwaitingInput;
        session.updated_at = Utc::now();
    }
}
