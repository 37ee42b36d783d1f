//! # Level Prompt
//!
//! What a provider is asked for: size, entity counts and theme content for
//! a given level ordinal, and the prompt text sent to a language model.

use crate::{config, Theme};
use serde::{Deserialize, Serialize};

/// Fixed content each theme asks the provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeContent {
    pub npc_name: &'static str,
    pub quest: &'static str,
    pub lesson_id: &'static str,
    pub item_names: &'static [&'static str],
    pub guardian_kind: &'static str,
}

const MEADOWS: ThemeContent = ThemeContent {
    npc_name: "Fitz",
    quest: "Find my lost items!",
    lesson_id: "articles_a_an",
    item_names: &["book", "hat", "apple", "map", "key"],
    guardian_kind: "article_imp",
};

const VOLCANOES: ThemeContent = ThemeContent {
    npc_name: "Vera",
    quest: "Activate the runes!",
    lesson_id: "tenses_simple_present",
    item_names: &["fire_rune", "lava_stone", "obsidian_shard", "magma_core"],
    guardian_kind: "tense_terror",
};

/// Content table for a theme. Unknown themes use the meadows table.
pub fn theme_content(theme: &Theme) -> &'static ThemeContent {
    match theme {
        Theme::Volcanoes => &VOLCANOES,
        Theme::Meadows | Theme::Other(_) => &MEADOWS,
    }
}

/// Request parameters derived from a level ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyHint {
    pub ordinal: u32,
    pub width: usize,
    pub height: usize,
    /// Number of quest items, and of guardians
    pub item_count: u32,
    pub theme: Theme,
}

impl DifficultyHint {
    /// Derives the hint for a level ordinal.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::{DifficultyHint, Theme};
    ///
    /// let hint = DifficultyHint::for_ordinal(2);
    /// assert_eq!(hint.item_count, 4);
    /// assert_eq!(hint.theme, Theme::Meadows);
    /// assert_eq!(DifficultyHint::for_ordinal(9).item_count, 7);
    /// ```
    pub fn for_ordinal(ordinal: u32) -> Self {
        let theme = if ordinal <= 3 {
            Theme::Meadows
        } else {
            Theme::Volcanoes
        };

        Self {
            ordinal,
            width: config::DEFAULT_GRID_WIDTH,
            height: config::DEFAULT_GRID_HEIGHT,
            item_count: 2 + ordinal.min(5),
            theme,
        }
    }

    /// Content table for the hinted theme.
    pub fn content(&self) -> &'static ThemeContent {
        theme_content(&self.theme)
    }
}

/// Renders the level-designer prompt for language-model providers.
#[derive(Debug, Clone, Default)]
pub struct LevelPrompt;

impl LevelPrompt {
    /// Creates a prompt renderer.
    pub fn new() -> Self {
        Self
    }

    /// Renders the prompt text for a hint.
    pub fn render(&self, hint: &DifficultyHint) -> String {
        let meadows = theme_content(&Theme::Meadows);
        let volcanoes = theme_content(&Theme::Volcanoes);

        format!(
            r#"You are a level designer for a 2D tile-based game. Your most important job is to create playable maps.

The Golden Rule: '0' is open floor and '1' is solid wall. Never place an important object (player, NPC, items, enemies, exit) on a '1' tile, and make sure a walkable path of '0' tiles leads from the player spawn to every important object. There can be no islands or areas completely surrounded by walls.

Task: generate a single level for difficulty {ordinal}. The grid size is {width}x{height}.

Strict requirements:
1. layout: a {width}x{height} array of rows of 0s and 1s.
2. playerSpawn: a single starting position on a '0' tile.
3. exitPosition: an exit point on a '0' tile.
4. Generate exactly {count} questItems and exactly {count} enemies to guard them, one NPC and one guidingStone. Place every element at a different coordinate on a '0' tile. Each quest item names its guardian in guardianId.
5. Connectivity: start at playerSpawn and trace a path of '0's to the NPC, the guiding stone, every quest item, every enemy and the exit. If any of them cannot be reached, fix the layout.
6. Theme (level {ordinal} uses '{theme}'):
   - Levels 1-3, theme 'meadows': NPC '{m_npc}', quest "{m_quest}", guiding stone '{m_lesson}', items ({m_items}), enemy type '{m_kind}'.
   - Level 4+, theme 'volcanoes': NPC '{v_npc}', quest "{v_quest}", guiding stone '{v_lesson}', items ({v_items}), enemy type '{v_kind}'.

Respond ONLY with minified JSON with the keys levelNumber, theme, layout, playerSpawn, exitPosition, npc {{name, position, quest}}, guidingStone {{lessonId, position}}, questItems [{{id, name, position, guardianId}}], enemies [{{id, type, position, challengeTopic}}]. Positions are {{"x": column, "y": row}}. Do not add comments or markdown."#,
            ordinal = hint.ordinal,
            width = hint.width,
            height = hint.height,
            count = hint.item_count,
            theme = hint.theme,
            m_npc = meadows.npc_name,
            m_quest = meadows.quest,
            m_lesson = meadows.lesson_id,
            m_items = quoted_list(meadows.item_names),
            m_kind = meadows.guardian_kind,
            v_npc = volcanoes.npc_name,
            v_quest = volcanoes.quest,
            v_lesson = volcanoes.lesson_id,
            v_items = quoted_list(volcanoes.item_names),
            v_kind = volcanoes.guardian_kind,
        )
    }
}

fn quoted_list(names: &[&str]) -> String {
    names
        .iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}
