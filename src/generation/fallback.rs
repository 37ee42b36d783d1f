//! # Canonical Fallback Level
//!
//! A hand-built Noun Meadows gauntlet served whenever synthesis cannot
//! produce a connected level of its own.

use crate::{
    config, ArticleChallenge, CollectibleItem, Grid, Guardian, KnowledgePoint, Level, Npc,
    PlacedEntity, Position, Theme, ARTICLE_OPTIONS,
};

const FALLBACK_LAYOUT: [[u8; 20]; 15] = [
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 1],
    [1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 1, 1, 0, 1, 0, 0, 0, 1, 0, 1],
    [1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 1, 0, 1, 1, 1, 0, 1],
    [1, 1, 1, 0, 1, 1, 0, 1, 1, 1, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1],
    [1, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1],
    [1, 0, 1, 0, 1, 0, 1, 1, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 0, 1],
    [1, 1, 1, 1, 1, 0, 1, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
    [1, 0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 1, 1, 0, 1],
    [1, 0, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0, 1, 0, 1, 0, 0, 1],
    [1, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1],
    [1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
];

const FALLBACK_SPAWN: Position = Position { x: 1, y: 7 };

/// (item id, item name, item tile, guardian id, guardian tile, challenge sentence)
const FALLBACK_QUEST: [(&str, &str, Position, &str, Position, &str); 3] = [
    (
        "item_1",
        "book",
        Position { x: 18, y: 2 },
        "enemy_1",
        Position { x: 17, y: 2 },
        "He is reading ___ book.",
    ),
    (
        "item_2",
        "hat",
        Position { x: 17, y: 8 },
        "enemy_2",
        Position { x: 17, y: 9 },
        "That is ___ nice hat.",
    ),
    (
        "item_3",
        "apple",
        Position { x: 8, y: 12 },
        "enemy_3",
        Position { x: 8, y: 11 },
        "She is eating ___ apple.",
    ),
];

/// Builds the fallback level labelled with `ordinal`.
///
/// The layout and placements are fixed and known to be connected, so the
/// level is assembled without going through hydration.
pub fn fallback_level(ordinal: u32) -> Level {
    let mut entities = vec![
        PlacedEntity::PlayerSpawn {
            position: FALLBACK_SPAWN,
        },
        PlacedEntity::ExitPoint {
            position: Position::new(18, 12),
        },
        PlacedEntity::Npc(Npc {
            name: "Fitz".to_string(),
            position: Position::new(3, 7),
            quest: "I seem to have dropped my things again! Can you find my book, hat, and apple?"
                .to_string(),
        }),
        PlacedEntity::KnowledgePoint(KnowledgePoint {
            lesson_id: "articles_a_an".to_string(),
            position: Position::new(2, 2),
        }),
    ];

    for (item_id, name, item_position, guardian_id, _, _) in FALLBACK_QUEST {
        entities.push(PlacedEntity::CollectibleItem(CollectibleItem {
            id: item_id.to_string(),
            name: name.to_string(),
            position: item_position,
            guardian_id: guardian_id.to_string(),
        }));
    }

    for (_, name, _, guardian_id, guardian_position, sentence) in FALLBACK_QUEST {
        let correct_answer = ArticleChallenge::for_item(name)
            .map(|derived| derived.correct_answer)
            .unwrap_or_else(|| ARTICLE_OPTIONS[0].to_string());
        entities.push(PlacedEntity::Guardian(Guardian {
            id: guardian_id.to_string(),
            kind: "article_imp".to_string(),
            position: guardian_position,
            patrol_range: 1,
            challenge_topic: None,
            challenge: ArticleChallenge {
                item_name: name.to_string(),
                sentence: sentence.to_string(),
                options: ARTICLE_OPTIONS.iter().map(|option| option.to_string()).collect(),
                correct_answer,
            },
        }));
    }

    Level::assemble(
        ordinal,
        Theme::Meadows,
        config::TILE_SIZE,
        Grid::from_table(&FALLBACK_LAYOUT),
        entities,
        FALLBACK_SPAWN,
    )
}
