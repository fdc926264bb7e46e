mod transcript;

pub use transcript::Transcript;

use crate::models::chat::{ Role, Turn };
use serde::{ Deserialize, Serialize };

/// Role names understood by the Gemini `contents` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiRole {
    User,
    Model,
}

impl From<Role> for ApiRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Human => ApiRole::User,
            Role::Assistant => ApiRole::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPart {
    pub text: String,
}

/// A turn as the remote API expects it. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ApiRole,
    pub parts: Vec<HistoryPart>,
}

impl HistoryEntry {
    pub fn new(role: ApiRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![HistoryPart { text: text.into() }],
        }
    }

    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect()
    }
}

pub fn adapt_history<'a, I>(turns: I) -> Vec<HistoryEntry>
    where I: IntoIterator<Item = &'a Turn>
{
    turns
        .into_iter()
        .map(|turn| HistoryEntry::new(turn.role().into(), turn.content()))
        .collect()
}
