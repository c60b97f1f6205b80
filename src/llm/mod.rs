pub mod openai;

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Text deltas of one streamed completion, in emission order.
///
/// The stream is finite and cannot be restarted. The first `Err` item is the
/// last item.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// A chat-completions backend that streams its answer.
///
/// Implementations must not hold on to caller state: the returned stream owns
/// everything it needs, so dropping it is enough to cancel the request.
pub trait ChatGateway: Send + Sync {
    fn stream_completion(&self, messages: Vec<ChatMessage>, config: &ProviderConfig)
        -> FragmentStream;
}

/// How the caller should react to a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Bad credentials; fix `API_KEY`.
    Unauthorized,
    /// Unknown model or endpoint; fix `DEFAULT_MODEL` / `BASE_URL`.
    ModelNotFound,
    /// Any other 4xx. Reported, not retried.
    Rejected,
    /// 5xx, timeouts and dropped connections. The user may retry.
    Transient,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Stream error: {0}")]
    Stream(String),
}

impl ProviderError {
    /// HTTP status returned by the provider, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            ProviderError::Http(e) => e.status().map(|s| s.as_u16()),
            ProviderError::Stream(_) => None,
        }
    }

    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::Api { status, .. } => match *status {
                401 => ProviderErrorKind::Unauthorized,
                404 => ProviderErrorKind::ModelNotFound,
                408 | 429 => ProviderErrorKind::Transient,
                400..=499 => ProviderErrorKind::Rejected,
                _ => ProviderErrorKind::Transient,
            },
            ProviderError::Http(e) if e.is_builder() => ProviderErrorKind::Rejected,
            ProviderError::Http(_) | ProviderError::Stream(_) => ProviderErrorKind::Transient,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ProviderErrorKind::Transient
    }
}
