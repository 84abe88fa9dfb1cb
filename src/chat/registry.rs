// src/chat/registry.rs — Per-connection session lookup

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;

use super::completion::{CompletionClient, CompletionOptions};
use super::session::Session;

/// Shared handle to one session. The async mutex is held for a whole round,
/// so a second submission for the same session has to wait or be refused.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// Maps session ids to live sessions. Every session gets its own transcript
/// and client handle; nothing mutable is shared between entries.
#[derive(Clone)]
pub struct SessionRegistry {
    client: CompletionClient,
    options: CompletionOptions,
    fallback_message: String,
    max_idle: Duration,
    sessions: Arc<Mutex<HashMap<String, Entry>>>,
}

impl SessionRegistry {
    pub fn new(
        client: CompletionClient,
        options: CompletionOptions,
        fallback_message: impl Into<String>,
        max_idle: Duration,
    ) -> Self {
        Self {
            client,
            options,
            fallback_message: fallback_message.into(),
            max_idle,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the map lock leaves it in a usable state.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a fresh session. Idle sessions are pruned on the way.
    pub fn create(&self) -> (String, SessionHandle) {
        self.prune_idle();

        let session = Session::new(self.client.clone(), self.options)
            .with_fallback_message(self.fallback_message.clone());
        let id = session.id().to_string();
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(session));

        let mut sessions = self.lock();
        sessions.insert(
            id.clone(),
            Entry {
                handle: handle.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(session = %id, active = sessions.len(), "Session created");
        (id, handle)
    }

    /// Look up a session and mark it as recently used.
    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        let mut sessions = self.lock();
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.handle.clone())
    }

    /// Existing session for `id`, or a new one when it is absent or unknown.
    /// The bool is true when a session was created.
    pub fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle, bool) {
        if let Some(id) = id {
            if let Some(handle) = self.get(id) {
                return (id.to_string(), handle, false);
            }
        }
        let (id, handle) = self.create();
        (id, handle, true)
    }

    /// Drop a session and move it to `Closed`. Returns false if unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let entry = self.lock().remove(id);
        match entry {
            Some(entry) => {
                entry.handle.lock().await.close();
                tracing::info!(session = %id, "Session removed");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget sessions not touched within the idle window. Activity is the
    /// later of the last lookup and the session's last round. Sessions in
    /// the middle of a round are kept.
    pub fn prune_idle(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        let max_idle = self.max_idle;
        sessions.retain(|_, e| {
            if e.last_seen.elapsed() < max_idle {
                return true;
            }
            match e.handle.try_lock() {
                Ok(session) => Utc::now()
                    .signed_duration_since(session.updated_at())
                    .to_std()
                    .map(|idle| idle < max_idle)
                    .unwrap_or(true),
                Err(_) => true,
            }
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = sessions.len(), "Pruned idle sessions");
        }
        pruned
    }
}
