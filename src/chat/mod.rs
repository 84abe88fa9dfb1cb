// src/chat/mod.rs — Conversation core: transcript, completion client, sessions

pub mod completion;
pub mod persona;
pub mod registry;
pub mod session;
pub mod transcript;

pub use completion::{CompletionClient, CompletionOptions};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::{Session, SessionState, Submission};
pub use transcript::{Speaker, Transcript, Turn, TurnId};
