use chrono::Utc;
use serde::{ Deserialize, Serialize };

/// Author of a turn. Serialised with the `human` / `ai` tags the browser UI uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "ai")]
    Assistant,
}

/// One message in the conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    timestamp: i64,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}
