//! WebSocket protocol messages for multiplayer games.

use crate::host::{GameSummary, HostEvent};
use serde::{Deserialize, Serialize};
use settlers_core::{GameAction, GameEvent, PlayerId};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game; `options` as `"PL=4,VP=10"`
    CreateGame {
        name: String,
        #[serde(default)]
        options: String,
        seed: Option<u64>,
    },

    /// Take a seat in a game
    JoinGame {
        game_id: Uuid,
        seat: PlayerId,
        player_name: String,
    },

    /// Leave the current game
    LeaveGame,

    /// Start the game once players are seated
    StartGame,

    /// Submit a game action
    GameAction { action: GameAction },

    /// Cut the current turn short
    ForceEndTurn,

    /// Request the full game state
    GetState,

    /// Request game list
    ListGames,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    Welcome { connection_id: Uuid },

    /// Game created successfully
    GameCreated { game_id: Uuid },

    /// Seated successfully
    JoinedGame { game_id: Uuid, seat: PlayerId },

    /// Left game successfully
    LeftGame,

    /// Full game state
    GameState { state: serde_json::Value },

    /// Result of this connection's action
    ActionResult {
        success: bool,
        events: Vec<GameEvent>,
        error: Option<String>,
    },

    /// Something happened in the game this connection sits in
    Broadcast { event: HostEvent },

    /// List of hosted games
    GameList { games: Vec<GameSummary> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

impl ServerMessage {
    pub fn error(message: impl ToString) -> Self {
        ServerMessage::Error {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_format() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"GameAction","payload":{"action":{"type":"PlaceRoad","edge":103}}}"#,
        )
        .unwrap();
        assert!(matches!(
            msg,
            ClientMessage::GameAction {
                action: GameAction::PlaceRoad { edge: 0x67 }
            }
        ));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"CreateGame","payload":{"name":"g","seed":null}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::CreateGame { options, .. } if options.is_empty()));
    }

    #[test]
    fn test_error_message() {
        let json = serde_json::to_string(&ServerMessage::error("Not your turn")).unwrap();
        assert_eq!(json, r#"{"type":"Error","payload":{"message":"Not your turn"}}"#);
    }
}
