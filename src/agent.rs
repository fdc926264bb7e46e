use crate::history::{ adapt_history, Transcript };
use crate::llm::chat::{ ChatClient, ChatError };
use crate::models::chat::{ Role, Turn };

use async_trait::async_trait;
use log::{ debug, info, warn };
use std::error::Error;
use std::sync::Arc;

pub type RenderError = Box<dyn Error + Send + Sync>;

/// Where a session paints its conversation.
#[async_trait]
pub trait RenderSink: Send {
    async fn render(&mut self, turn: &Turn) -> Result<(), RenderError>;

    /// Signals that a reply is pending.
    async fn render_processing(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    async fn render_failure(&mut self, error: &ChatError) -> Result<(), RenderError>;
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// Nothing was submitted.
    Idle,
    Answered(String),
    /// The model call failed. The human turn stays in the transcript unanswered.
    Failed(ChatError),
}

impl TurnOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TurnOutcome::Failed(_))
    }
}

pub struct ChatSession {
    transcript: Transcript,
    client: Arc<dyn ChatClient>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        let transcript = Transcript::new();
        info!(
            "Session {} started (model={})",
            transcript.session_id(),
            client.get_model()
        );
        Self { transcript, client }
    }

    pub fn id(&self) -> &str {
        self.transcript.session_id()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub async fn process_message<S>(
        &mut self,
        input: Option<&str>,
        sink: &mut S
    ) -> Result<TurnOutcome, RenderError>
        where S: RenderSink + ?Sized
    {
        let query = match input {
            Some(q) if !q.is_empty() => q,
            _ => {
                debug!("Session {}: empty input, nothing to do", self.id());
                return Ok(TurnOutcome::Idle);
            }
        };

        let prior_turns = self.transcript.len();
        let human = self.transcript.append(Role::Human, query).clone();
        sink.render(&human).await?;

        let history = adapt_history(self.transcript.all().take(prior_turns));
        sink.render_processing().await?;

        match self.client.send_message(&history, query).await {
            Ok(reply) => {
                let turn = Turn::new(Role::Assistant, reply.clone());
                sink.render(&turn).await?;
                self.transcript.push(turn);
                debug!(
                    "Session {}: turn answered ({} turns in transcript)",
                    self.id(),
                    self.transcript.len()
                );
                Ok(TurnOutcome::Answered(reply))
            }
            Err(e) => {
                warn!("Session {}: turn failed: {}", self.id(), e);
                sink.render_failure(&e).await?;
                Ok(TurnOutcome::Failed(e))
            }
        }
    }
}
