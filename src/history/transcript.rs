use crate::models::chat::{ Role, Turn };
use uuid::Uuid;

/// Append-only, in-memory record of one session's turns.
///
/// Turns cannot be removed or edited. The transcript lives exactly as long
/// as the session that owns it.
#[derive(Debug, Clone)]
pub struct Transcript {
    session_id: String,
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            turns: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Turn {
        self.push(Turn::new(role, content))
    }

    pub fn push(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        let last = self.turns.len() - 1;
        &self.turns[last]
    }

    /// Turns in insertion order. Calling it again restarts from the first turn.
    pub fn all(&self) -> impl Iterator<Item = &Turn> + '_ {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn count(&self, role: Role) -> usize {
        self.turns
            .iter()
            .filter(|t| t.role() == role)
            .count()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
