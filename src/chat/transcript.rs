// src/chat/transcript.rs — Append-only conversation log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// 1-based position of a turn in its transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(pub u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One utterance. Fields are private so a turn cannot change after append.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    id: TurnId,
    speaker: Speaker,
    text: String,
    created_at: DateTime<Utc>,
    /// Assistant text is the substituted failure reply, not model output.
    fallback: bool,
}

impl Turn {
    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Ordered, append-only sequence of turns for one session.
/// The only mutators are [`Transcript::append`] and [`Transcript::append_fallback`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end. Never fails; returns the new length as its id.
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> TurnId {
        self.push(speaker, text.into(), false)
    }

    /// Add an assistant turn carrying the fallback reply.
    pub fn append_fallback(&mut self, text: impl Into<String>) -> TurnId {
        self.push(Speaker::Assistant, text.into(), true)
    }

    fn push(&mut self, speaker: Speaker, text: String, fallback: bool) -> TurnId {
        let id = TurnId(self.turns.len() as u64 + 1);
        self.turns.push(Turn {
            id,
            speaker,
            text,
            created_at: Utc::now(),
            fallback,
        });
        id
    }

    /// Lazy view of every turn in insertion order. Cloning the iterator
    /// restarts the walk without touching the transcript.
    pub fn all(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        let idx = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.turns.get(idx)
    }

    /// User/assistant pairs whose reply came from the model.
    ///
    /// Failed exchanges never reached the remote context, so they are left
    /// out; a trailing user turn with no reply yet is also skipped.
    pub fn exchanges(&self) -> impl Iterator<Item = (&Turn, &Turn)> + '_ {
        self.turns.windows(2).filter_map(|w| match (&w[0], &w[1]) {
            (u, a)
                if u.speaker == Speaker::User
                    && a.speaker == Speaker::Assistant
                    && !a.fallback =>
            {
                Some((u, a))
            }
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.all()
    }
}
