use serde::{ Serialize, Deserialize };
use super::chat::{ Role, Turn };

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "chat")] Chat {
        #[serde(default)]
        content: Option<String>,
    },
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "session")] Session {
        session_id: String,
    },
    #[serde(rename = "turn")] Turn {
        role: Role,
        content: String,
        timestamp: i64,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
    #[serde(rename = "processing")]
    Processing,
}

impl From<&Turn> for ServerMessage {
    fn from(turn: &Turn) -> Self {
        ServerMessage::Turn {
            role: turn.role(),
            content: turn.content().to_string(),
            timestamp: turn.timestamp(),
        }
    }
}
