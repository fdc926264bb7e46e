pub mod gemini;

use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use thiserror::Error;
use super::LlmConfig;
use self::gemini::GeminiChatClient;
use crate::history::HistoryEntry;

/// Raw outcome of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Complete(String),
    /// The model stopped early but still produced a usable candidate.
    Stopped {
        partial: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth {
        status: u16,
        message: String,
    },
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
    },
    #[error("prompt blocked: {0}")]
    Blocked(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("response contained no candidates")]
    EmptyResponse,
    #[error("model returned no text (finish reason: {reason})")]
    EmptyCandidate {
        reason: String,
    },
    #[error("invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `query` as the newest user turn on top of `history`.
    /// Exactly one outbound request per call.
    async fn generate(
        &self,
        history: &[HistoryEntry],
        query: &str
    ) -> Result<Generation, ChatError>;

    /// Like [`ChatClient::generate`], but an early stop with a partial
    /// candidate is returned as an ordinary reply. A reply with no text is
    /// an error and must never reach the transcript.
    async fn send_message(
        &self,
        history: &[HistoryEntry],
        query: &str
    ) -> Result<String, ChatError> {
        match self.generate(history, query).await? {
            Generation::Complete(text) if text.trim().is_empty() => {
                Err(ChatError::EmptyCandidate { reason: "STOP".into() })
            }
            Generation::Complete(text) => Ok(text),
            Generation::Stopped { partial, reason } if partial.trim().is_empty() => {
                Err(ChatError::EmptyCandidate { reason })
            }
            Generation::Stopped { partial, reason } => {
                warn!(
                    "Model {} stopped early ({}); returning partial candidate",
                    self.get_model(),
                    reason
                );
                Ok(partial)
            }
        }
    }

    fn get_model(&self) -> String;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, ChatError> {
    let client: Arc<dyn ChatClient> = Arc::new(GeminiChatClient::from_config(config)?);
    Ok(client)
}
