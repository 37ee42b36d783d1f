//! # Entity Hydration
//!
//! Turns an untrusted [`RawPayload`] into a typed [`Level`].
//!
//! Hydration is strict: anything structurally wrong with the payload is a
//! `MalformedPayload` error rather than something to be patched up. Only
//! connectivity problems are left for the repair stage.

use crate::{
    config, ArticleChallenge, CollectibleItem, Grid, Guardian, KnowledgePoint, Level,
    LevelforgeError, LevelforgeResult, Npc, PlacedEntity, Position, RawPayload, RawPosition,
    Theme,
};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Builds levels from raw provider payloads.
#[derive(Debug, Clone)]
pub struct EntityHydrator {
    /// Edge length of a tile in pixels, recorded on every level
    pub tile_size: u32,
}

impl EntityHydrator {
    /// Creates a hydrator for the given tile size.
    pub fn new(tile_size: u32) -> Self {
        Self { tile_size }
    }

    /// Hydrates a payload into a level.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::{EntityHydrator, RawPayload};
    ///
    /// let payload = RawPayload::from_json(r#"{
    ///     "levelNumber": 1, "theme": "meadows",
    ///     "layout": [[0, 0, 0], [0, 0, 0]],
    ///     "playerSpawn": {"x": 0, "y": 0}, "exitPosition": {"x": 2, "y": 1},
    ///     "npc": {"name": "Fitz", "position": {"x": 1, "y": 0}, "quest": "Find my lost items!"},
    ///     "guidingStone": {"lessonId": "articles_a_an", "position": {"x": 2, "y": 0}},
    ///     "questItems": [], "enemies": []
    /// }"#).unwrap();
    ///
    /// let level = EntityHydrator::default().hydrate(payload).unwrap();
    /// assert_eq!(level.required_targets().len(), 3);
    /// ```
    pub fn hydrate(&self, payload: RawPayload) -> LevelforgeResult<Level> {
        let grid = Grid::from_rows(&payload.layout)?;

        let spawn = tile(&grid, payload.player_spawn, "player spawn")?;
        let exit = tile(&grid, payload.exit_position, "exit")?;
        let npc_position = tile(&grid, payload.npc.position, "npc")?;
        let stone_position = tile(&grid, payload.guiding_stone.position, "guiding stone")?;

        let mut guardian_ids = HashSet::new();
        for enemy in &payload.enemies {
            if !guardian_ids.insert(enemy.id.as_str()) {
                return Err(malformed(format!("duplicate guardian id '{}'", enemy.id)));
            }
        }

        // Guardian id -> name of the first item it protects
        let mut guarded_items: HashMap<&str, &str> = HashMap::new();
        let mut item_ids = HashSet::new();
        for item in &payload.quest_items {
            if !item_ids.insert(item.id.as_str()) {
                return Err(malformed(format!("duplicate item id '{}'", item.id)));
            }
            if item.name.is_empty() {
                return Err(malformed(format!("item '{}' has an empty name", item.id)));
            }
            if !guardian_ids.contains(item.guardian_id.as_str()) {
                return Err(malformed(format!(
                    "item '{}' references unknown guardian '{}'",
                    item.id, item.guardian_id
                )));
            }
            guarded_items
                .entry(item.guardian_id.as_str())
                .or_insert(item.name.as_str());
        }

        let mut guardians = Vec::with_capacity(payload.enemies.len());
        for enemy in &payload.enemies {
            let item_name = guarded_items.get(enemy.id.as_str()).ok_or_else(|| {
                malformed(format!("guardian '{}' guards no item", enemy.id))
            })?;
            let challenge = ArticleChallenge::for_item(item_name)
                .ok_or_else(|| malformed(format!("guardian '{}' has no item name", enemy.id)))?;

            guardians.push(PlacedEntity::Guardian(Guardian {
                id: enemy.id.clone(),
                kind: enemy.kind.clone(),
                position: tile(&grid, enemy.position, "guardian")?,
                patrol_range: config::GUARDIAN_PATROL_TILES,
                challenge_topic: enemy.challenge_topic.clone(),
                challenge,
            }));
        }

        let mut entities = Vec::with_capacity(4 + payload.quest_items.len() + guardians.len());
        entities.push(PlacedEntity::PlayerSpawn { position: spawn });
        entities.push(PlacedEntity::ExitPoint { position: exit });
        entities.push(PlacedEntity::Npc(Npc {
            name: payload.npc.name,
            position: npc_position,
            quest: payload.npc.quest,
        }));
        entities.push(PlacedEntity::KnowledgePoint(KnowledgePoint {
            lesson_id: payload.guiding_stone.lesson_id,
            position: stone_position,
        }));
        for item in payload.quest_items {
            let position = tile(&grid, item.position, "item")?;
            entities.push(PlacedEntity::CollectibleItem(CollectibleItem {
                id: item.id,
                name: item.name,
                position,
                guardian_id: item.guardian_id,
            }));
        }
        entities.extend(guardians);

        debug!(
            "Hydrated level {} ({}x{}, {} entities)",
            payload.level_number,
            grid.width(),
            grid.height(),
            entities.len()
        );

        Level::new(
            payload.level_number,
            Theme::from(payload.theme),
            self.tile_size,
            grid,
            entities,
        )
        .map_err(|e| match e {
            LevelforgeError::InvalidLevel(reason) => LevelforgeError::MalformedPayload(reason),
            other => other,
        })
    }
}

impl Default for EntityHydrator {
    fn default() -> Self {
        Self::new(config::TILE_SIZE)
    }
}

fn malformed(reason: String) -> LevelforgeError {
    LevelforgeError::MalformedPayload(reason)
}

/// Converts a raw coordinate into an in-bounds tile position.
fn tile(grid: &Grid, raw: RawPosition, what: &str) -> LevelforgeResult<Position> {
    let in_range = raw.x >= 0
        && raw.y >= 0
        && (raw.x as u64) < grid.width() as u64
        && (raw.y as u64) < grid.height() as u64;
    if !in_range {
        return Err(malformed(format!(
            "{} at ({}, {}) is outside the {}x{} grid",
            what,
            raw.x,
            raw.y,
            grid.width(),
            grid.height()
        )));
    }
    Ok(Position::new(raw.x as i32, raw.y as i32))
}
