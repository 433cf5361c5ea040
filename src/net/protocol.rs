use serde::{Deserialize, Serialize};

use crate::game::snapshot::WorldSnapshot;
use crate::game::state::PlayerId;

/// Messages from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Leave the lobby and enter the arena
    Spawn {
        name: String,
        #[serde(default)]
        country: String,
    },
    /// A steering key went down or up
    #[serde(rename_all = "camelCase")]
    KeyHandler {
        key: u32,
        #[serde(alias = "pressed")]
        is_pressed: bool,
    },
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once per connection with the arena size and the client's id
    #[serde(rename_all = "camelCase")]
    Initial {
        arena_width: f32,
        arena_height: f32,
        player_id: PlayerId,
    },
    /// Full world state for this tick
    Update(WorldSnapshot),
    /// The client's player fell into a lethal well
    Death,
}

/// Encode a message as JSON
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(message).map_err(|e| EncodeError(e.to_string()))
}

/// Decode a JSON message
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(data).map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);
