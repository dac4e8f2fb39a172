use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Messages accepted from player WebSocket clients.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerInboundMessage {
    /// Must be the first frame of a session.
    Identify {
        /// Player of the room opening the session.
        nickname: String,
    },
    /// Ask the server to broadcast the start signal.
    StartGame,
    /// Any other `type`.
    #[serde(other)]
    Unknown,
}

impl PlayerInboundMessage {
    /// Nickname carried by an identify frame.
    pub fn identify_nickname(&self) -> Option<&str> {
        match self {
            Self::Identify { nickname } => Some(nickname.as_str()),
            _ => None,
        }
    }
}

/// Sent to a player once its session is registered.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionAck {
    /// Room PIN.
    pub pin: u32,
    /// Identified player.
    pub nickname: String,
    /// Always `connected`.
    pub status: String,
}

/// Sent when an inbound command could not be handled.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionError {
    /// Always `error`.
    #[serde(rename = "type")]
    pub kind: String,
    /// What went wrong.
    pub message: String,
}

impl SessionError {
    /// Error frame carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inbound_frames() {
        let identify: PlayerInboundMessage =
            serde_json::from_str(r#"{"type":"identify","nickname":"alice"}"#).unwrap();
        assert_eq!(identify.identify_nickname(), Some("alice"));

        let start: PlayerInboundMessage = serde_json::from_str(r#"{"type":"start_game"}"#).unwrap();
        assert!(matches!(start, PlayerInboundMessage::StartGame));

        let other: PlayerInboundMessage = serde_json::from_str(r#"{"type":"dance"}"#).unwrap();
        assert!(matches!(other, PlayerInboundMessage::Unknown));
    }
}
