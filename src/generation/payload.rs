//! # Raw Payload
//!
//! The untrusted level description a content provider returns, in the JSON
//! shape the level prompt asks for.

use crate::{LevelforgeError, LevelforgeResult, Position};
use serde::{Deserialize, Serialize};

/// Tile coordinate as sent by a provider. Kept signed and wide so that
/// nonsense values survive parsing and are rejected during hydration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosition {
    pub x: i64,
    pub y: i64,
}

impl RawPosition {
    /// Creates a raw coordinate.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<Position> for RawPosition {
    fn from(pos: Position) -> Self {
        Self::new(pos.x as i64, pos.y as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNpc {
    pub name: String,
    pub position: RawPosition,
    pub quest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGuidingStone {
    pub lesson_id: String,
    pub position: RawPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuestItem {
    pub id: String,
    pub name: String,
    pub position: RawPosition,
    pub guardian_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEnemy {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub position: RawPosition,
    #[serde(default)]
    pub challenge_topic: Option<String>,
}

/// A complete candidate level as delivered by a content provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    pub level_number: u32,
    pub theme: String,
    /// Rows of `0` (open) and `1` (blocked)
    pub layout: Vec<Vec<u8>>,
    pub player_spawn: RawPosition,
    pub exit_position: RawPosition,
    pub npc: RawNpc,
    pub guiding_stone: RawGuidingStone,
    pub quest_items: Vec<RawQuestItem>,
    pub enemies: Vec<RawEnemy>,
}

impl RawPayload {
    /// Parses a payload from provider JSON.
    ///
    /// Missing fields and wrong types are reported as `MalformedPayload`.
    pub fn from_json(text: &str) -> LevelforgeResult<Self> {
        serde_json::from_str(text.trim())
            .map_err(|e| LevelforgeError::MalformedPayload(format!("unparseable payload: {}", e)))
    }

    /// Serializes the payload back to JSON.
    pub fn to_json(&self) -> LevelforgeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
