//! # Placed Entities
//!
//! Everything a level places on its grid, modelled as one closed tagged union
//! so every consumer handles every role exhaustively.

use crate::{PixelPosition, Position};
use serde::{Deserialize, Serialize};

/// Identity used for the player spawn marker.
pub const PLAYER_SPAWN_ID: &str = "player_spawn";

/// Identity used for the exit marker.
pub const EXIT_POINT_ID: &str = "exit";

/// The answer options offered by every article challenge.
pub const ARTICLE_OPTIONS: [&str; 2] = ["a", "an"];

/// Role of a placed entity without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRole {
    PlayerSpawn,
    ExitPoint,
    Npc,
    KnowledgePoint,
    CollectibleItem,
    Guardian,
}

impl EntityRole {
    /// Single-character glyph used by the ASCII level view.
    pub fn glyph(self) -> char {
        match self {
            EntityRole::PlayerSpawn => '@',
            EntityRole::ExitPoint => '>',
            EntityRole::Npc => 'N',
            EntityRole::KnowledgePoint => 'K',
            EntityRole::CollectibleItem => 'i',
            EntityRole::Guardian => 'g',
        }
    }
}

/// A non-player character offering the level's quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub position: Position,
    pub quest: String,
}

/// A guiding stone that teaches a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgePoint {
    pub lesson_id: String,
    pub position: Position,
}

/// A quest item guarded by a guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectibleItem {
    pub id: String,
    pub name: String,
    pub position: Position,
    /// Identity of the guardian protecting this item
    pub guardian_id: String,
}

/// Fill-in-the-blank article question a guardian asks the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleChallenge {
    pub item_name: String,
    pub sentence: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl ArticleChallenge {
    /// Derives the challenge for an item name.
    ///
    /// The answer is "an" when the name starts with a vowel and "a" otherwise.
    /// Returns `None` for an empty name.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::ArticleChallenge;
    ///
    /// let challenge = ArticleChallenge::for_item("apple").unwrap();
    /// assert_eq!(challenge.sentence, "It is ___ apple.");
    /// assert_eq!(challenge.correct_answer, "an");
    /// assert_eq!(ArticleChallenge::for_item("book").unwrap().correct_answer, "a");
    /// ```
    pub fn for_item(item_name: &str) -> Option<Self> {
        let first = item_name.chars().next()?;
        let correct_answer = if matches!(first.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u') {
            ARTICLE_OPTIONS[1]
        } else {
            ARTICLE_OPTIONS[0]
        };

        Some(Self {
            item_name: item_name.to_string(),
            sentence: format!("It is ___ {}.", item_name),
            options: ARTICLE_OPTIONS.iter().map(|option| option.to_string()).collect(),
            correct_answer: correct_answer.to_string(),
        })
    }
}

/// An enemy that guards one collectible item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    pub id: String,
    /// Provider type tag, e.g. `article_imp`
    pub kind: String,
    pub position: Position,
    /// Patrol range in tiles
    pub patrol_range: u32,
    pub challenge_topic: Option<String>,
    pub challenge: ArticleChallenge,
}

/// Any entity placed on a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacedEntity {
    PlayerSpawn { position: Position },
    ExitPoint { position: Position },
    Npc(Npc),
    KnowledgePoint(KnowledgePoint),
    CollectibleItem(CollectibleItem),
    Guardian(Guardian),
}

impl PlacedEntity {
    /// Stable identity of the entity within its level.
    pub fn id(&self) -> &str {
        match self {
            PlacedEntity::PlayerSpawn { .. } => PLAYER_SPAWN_ID,
            PlacedEntity::ExitPoint { .. } => EXIT_POINT_ID,
            PlacedEntity::Npc(npc) => &npc.name,
            PlacedEntity::KnowledgePoint(point) => &point.lesson_id,
            PlacedEntity::CollectibleItem(item) => &item.id,
            PlacedEntity::Guardian(guardian) => &guardian.id,
        }
    }

    /// Tile position of the entity.
    pub fn position(&self) -> Position {
        match self {
            PlacedEntity::PlayerSpawn { position } | PlacedEntity::ExitPoint { position } => {
                *position
            }
            PlacedEntity::Npc(npc) => npc.position,
            PlacedEntity::KnowledgePoint(point) => point.position,
            PlacedEntity::CollectibleItem(item) => item.position,
            PlacedEntity::Guardian(guardian) => guardian.position,
        }
    }

    /// Pixel position for the rendering side of the runtime.
    pub fn pixel_position(&self, tile_size: u32) -> PixelPosition {
        self.position().to_pixels(tile_size)
    }

    /// Role tag of the entity.
    pub fn role(&self) -> EntityRole {
        match self {
            PlacedEntity::PlayerSpawn { .. } => EntityRole::PlayerSpawn,
            PlacedEntity::ExitPoint { .. } => EntityRole::ExitPoint,
            PlacedEntity::Npc(_) => EntityRole::Npc,
            PlacedEntity::KnowledgePoint(_) => EntityRole::KnowledgePoint,
            PlacedEntity::CollectibleItem(_) => EntityRole::CollectibleItem,
            PlacedEntity::Guardian(_) => EntityRole::Guardian,
        }
    }

    /// Whether the player must be able to walk to this entity.
    pub fn is_required(&self) -> bool {
        match self {
            PlacedEntity::PlayerSpawn { .. } => false,
            PlacedEntity::ExitPoint { .. }
            | PlacedEntity::Npc(_)
            | PlacedEntity::KnowledgePoint(_)
            | PlacedEntity::CollectibleItem(_)
            | PlacedEntity::Guardian(_) => true,
        }
    }
}
