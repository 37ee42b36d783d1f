//! # Level Aggregate
//!
//! A grid plus everything placed on it, as handed to the game runtime.

use crate::{
    CollectibleItem, EntityRole, Grid, Guardian, LevelforgeError, LevelforgeResult,
    PlacedEntity, Position,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Visual theme of a level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Theme {
    /// The Noun Meadows
    Meadows,
    /// The Verb Volcanoes
    Volcanoes,
    /// Any theme tag the runtime does not know about
    Other(String),
}

impl Theme {
    /// Wire name of the theme.
    pub fn as_str(&self) -> &str {
        match self {
            Theme::Meadows => "meadows",
            Theme::Volcanoes => "volcanoes",
            Theme::Other(tag) => tag,
        }
    }
}

impl From<String> for Theme {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "meadows" => Theme::Meadows,
            "volcanoes" => Theme::Volcanoes,
            _ => Theme::Other(tag),
        }
    }
}

impl From<&str> for Theme {
    fn from(tag: &str) -> Self {
        Theme::from(tag.to_string())
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        theme.as_str().to_string()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A level: grid topology, placed entities and metadata.
///
/// Construction checks the structural invariants (one spawn, one exit,
/// every entity in bounds, spawn on an open cell). Entities never move after
/// construction; only the grid can change, and only by opening cells.
/// Deserialization goes through the same checks as [`Level::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LevelRecord")]
pub struct Level {
    /// Unique identifier of this level instance
    pub id: Uuid,
    /// Level ordinal (1-based difficulty)
    pub ordinal: u32,
    /// Theme tag
    pub theme: Theme,
    /// Edge length of a tile in pixels
    pub tile_size: u32,
    grid: Grid,
    entities: Vec<PlacedEntity>,
    spawn: Position,
}

impl Level {
    /// Creates a level after checking its structural invariants.
    pub fn new(
        ordinal: u32,
        theme: Theme,
        tile_size: u32,
        grid: Grid,
        entities: Vec<PlacedEntity>,
    ) -> LevelforgeResult<Self> {
        let mut spawns = entities.iter().filter_map(|entity| match entity {
            PlacedEntity::PlayerSpawn { position } => Some(*position),
            _ => None,
        });
        let spawn = spawns
            .next()
            .ok_or_else(|| LevelforgeError::InvalidLevel("level has no player spawn".to_string()))?;
        if spawns.next().is_some() {
            return Err(LevelforgeError::InvalidLevel(
                "level has more than one player spawn".to_string(),
            ));
        }

        let exits = entities
            .iter()
            .filter(|entity| entity.role() == EntityRole::ExitPoint)
            .count();
        if exits != 1 {
            return Err(LevelforgeError::InvalidLevel(format!(
                "level has {} exit points, expected 1",
                exits
            )));
        }

        if let Some(entity) = entities.iter().find(|entity| !grid.in_bounds(entity.position())) {
            return Err(LevelforgeError::InvalidLevel(format!(
                "{:?} '{}' at {} is outside the {}x{} grid",
                entity.role(),
                entity.id(),
                entity.position(),
                grid.width(),
                grid.height()
            )));
        }

        if !grid.is_open(spawn) {
            return Err(LevelforgeError::InvalidLevel(format!(
                "player spawn {} is on a blocked cell",
                spawn
            )));
        }

        Ok(Self::assemble(ordinal, theme, tile_size, grid, entities, spawn))
    }

    /// Builds a level from parts already known to satisfy the invariants.
    pub(crate) fn assemble(
        ordinal: u32,
        theme: Theme,
        tile_size: u32,
        grid: Grid,
        entities: Vec<PlacedEntity>,
        spawn: Position,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ordinal,
            theme,
            tile_size,
            grid,
            entities,
            spawn,
        }
    }

    /// The walkable topology.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// All placed entities, spawn first.
    pub fn entities(&self) -> &[PlacedEntity] {
        &self.entities
    }

    /// Position of the player spawn.
    pub fn player_spawn(&self) -> Position {
        self.spawn
    }

    /// Finds an entity by identity.
    pub fn entity(&self, id: &str) -> Option<&PlacedEntity> {
        self.entities.iter().find(|entity| entity.id() == id)
    }

    /// Positions the player must be able to reach, in entity order.
    pub fn required_targets(&self) -> Vec<Position> {
        self.entities
            .iter()
            .filter(|entity| entity.is_required())
            .map(PlacedEntity::position)
            .collect()
    }

    /// All collectible items.
    pub fn items(&self) -> impl Iterator<Item = &CollectibleItem> {
        self.entities.iter().filter_map(|entity| match entity {
            PlacedEntity::CollectibleItem(item) => Some(item),
            _ => None,
        })
    }

    /// All guardians.
    pub fn guardians(&self) -> impl Iterator<Item = &Guardian> {
        self.entities.iter().filter_map(|entity| match entity {
            PlacedEntity::Guardian(guardian) => Some(guardian),
            _ => None,
        })
    }

    /// Swaps in a repaired grid.
    ///
    /// The new grid must have the same dimensions and keep every open cell
    /// of the current one open.
    pub fn apply_repair(&mut self, repaired: Grid) -> LevelforgeResult<()> {
        if repaired.width() != self.grid.width() || repaired.height() != self.grid.height() {
            return Err(LevelforgeError::InvalidLevel(format!(
                "repaired grid is {}x{}, level grid is {}x{}",
                repaired.width(),
                repaired.height(),
                self.grid.width(),
                self.grid.height()
            )));
        }
        if let Some(closed) = self.grid.open_positions().find(|&pos| !repaired.is_open(pos)) {
            return Err(LevelforgeError::InvalidLevel(format!(
                "repair would block open cell {}",
                closed
            )));
        }

        self.grid = repaired;
        Ok(())
    }

    /// Returns a copy of this level carrying another ordinal and a fresh id.
    pub fn relabeled(&self, ordinal: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            ordinal,
            ..self.clone()
        }
    }
}

/// Serialized form of a [`Level`], checked before it becomes one.
#[derive(Deserialize)]
struct LevelRecord {
    id: Uuid,
    ordinal: u32,
    theme: Theme,
    tile_size: u32,
    grid: Grid,
    entities: Vec<PlacedEntity>,
}

impl TryFrom<LevelRecord> for Level {
    type Error = LevelforgeError;

    fn try_from(record: LevelRecord) -> LevelforgeResult<Self> {
        let mut level = Level::new(
            record.ordinal,
            record.theme,
            record.tile_size,
            record.grid,
            record.entities,
        )?;
        level.id = record.id;
        Ok(level)
    }
}

impl fmt::Display for Level {
    /// Renders an ASCII map; earlier entities win shared tiles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.grid.width();
        let mut glyphs: Vec<char> = self
            .grid
            .positions()
            .map(|pos| if self.grid.is_open(pos) { '.' } else { '#' })
            .collect();

        for entity in self.entities.iter().rev() {
            let pos = entity.position();
            if !self.grid.in_bounds(pos) {
                continue;
            }
            if let Some(glyph) = glyphs.get_mut(pos.y as usize * width + pos.x as usize) {
                *glyph = entity.role().glyph();
            }
        }

        for row in glyphs.chunks(width) {
            writeln!(f, "{}", row.iter().collect::<String>())?;
        }
        Ok(())
    }
}
