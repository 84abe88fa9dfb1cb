// src/infra/errors.rs — Error types for banter

use thiserror::Error;

/// Any failure reaching the remote generation service.
///
/// Sessions never surface these to the rendering layer; they are logged and
/// replaced with the fallback reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("Network error talking to '{provider}': {message}")]
    Network { provider: String, message: String },

    #[error("Request to '{provider}' timed out")]
    Timeout { provider: String },

    #[error("'{provider}' rejected the credential (HTTP {status})")]
    Auth { provider: String, status: u16 },

    #[error("Quota exhausted or rate limited by '{provider}'")]
    Quota { provider: String },

    #[error("'{provider}' returned HTTP {status}: {message}")]
    Service {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Malformed response from '{provider}': {message}")]
    Malformed { provider: String, message: String },

    #[error("'{provider}' returned no text (finish reason: {reason})")]
    EmptyReply { provider: String, reason: String },
}

impl CompletionError {
    /// Whether a later attempt could plausibly succeed. Used for log
    /// classification only; sessions never retry.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Network { .. }
            | CompletionError::Timeout { .. }
            | CompletionError::Quota { .. } => true,
            CompletionError::Service { status, .. } => *status >= 500,
            CompletionError::Auth { .. }
            | CompletionError::Malformed { .. }
            | CompletionError::EmptyReply { .. } => false,
        }
    }

    /// Short machine-readable label for logs and API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Network { .. } => "network",
            CompletionError::Timeout { .. } => "timeout",
            CompletionError::Auth { .. } => "auth",
            CompletionError::Quota { .. } => "quota",
            CompletionError::Service { .. } => "service",
            CompletionError::Malformed { .. } => "malformed",
            CompletionError::EmptyReply { .. } => "empty_reply",
        }
    }

    /// Map a transport-level reqwest error.
    pub fn from_transport(provider: &str, e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout {
                provider: provider.into(),
            }
        } else if e.is_decode() {
            CompletionError::Malformed {
                provider: provider.into(),
                message: e.to_string(),
            }
        } else {
            CompletionError::Network {
                provider: provider.into(),
                message: e.to_string(),
            }
        }
    }

    /// Map a non-success HTTP status plus its (possibly empty) body.
    pub fn from_status(provider: &str, status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => CompletionError::Auth {
                provider: provider.into(),
                status: status.as_u16(),
            },
            429 => CompletionError::Quota {
                provider: provider.into(),
            },
            code => CompletionError::Service {
                provider: provider.into(),
                status: code,
                message: body,
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum BanterError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Session '{id}' not found")]
    SessionNotFound { id: String },

    #[error("No API key found. Set {env_var} or update [model] in config.toml.")]
    MissingCredential { env_var: String },

    #[error("Unknown provider '{0}'. Expected 'google' or 'openai_compat'.")]
    UnknownProvider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
