//! # Offline Provider
//!
//! A local stand-in for a language model. It produces noise-based caves with
//! the same failure modes a real provider has: disconnected pockets, objects
//! sitting inside walls, transient faults and a finite quota.

use crate::{
    ContentProvider, DifficultyHint, ProviderError, RawEnemy, RawGuidingStone, RawNpc,
    RawPayload, RawPosition, RawQuestItem,
};
use async_trait::async_trait;
use log::debug;
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Configuration for the offline provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineProviderConfig {
    /// Random seed for reproducible output
    pub seed: u64,
    /// Noise frequency; larger values give smaller caves
    pub noise_scale: f64,
    /// Noise values above this become walls (-1.0 to 1.0)
    pub wall_threshold: f64,
    /// Chance that an entity is dropped on any interior tile instead of an open one
    pub misplacement_chance: f64,
    /// Chance of a transient fault per request (0.0 to 1.0)
    pub failure_rate: f64,
    /// Requests served before the quota runs out
    pub quota_budget: Option<u32>,
}

impl OfflineProviderConfig {
    /// Creates the default configuration for a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            noise_scale: 0.21,
            wall_threshold: 0.12,
            misplacement_chance: 0.15,
            failure_rate: 0.0,
            quota_budget: None,
        }
    }
}

impl Default for OfflineProviderConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Seeded procedural content provider.
pub struct OfflineProvider {
    config: OfflineProviderConfig,
    rng: Mutex<StdRng>,
    calls: AtomicU32,
}

impl OfflineProvider {
    /// Creates a provider from its configuration.
    pub fn new(config: OfflineProviderConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng: Mutex::new(rng),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Generates one payload for the hint.
    pub fn generate(&self, ordinal: u32, hint: &DifficultyHint, rng: &mut StdRng) -> RawPayload {
        let width = hint.width.max(3);
        let height = hint.height.max(3);
        let perlin = Perlin::new(rng.gen());

        let layout: Vec<Vec<u8>> = (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| {
                        let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                        let value = perlin.get([
                            x as f64 * self.config.noise_scale,
                            y as f64 * self.config.noise_scale,
                        ]);
                        u8::from(border || value > self.config.wall_threshold)
                    })
                    .collect()
            })
            .collect();

        let mut open = Vec::new();
        let mut walls = Vec::new();
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let pos = RawPosition::new(x as i64, y as i64);
                if layout[y][x] == 0 {
                    open.push(pos);
                } else {
                    walls.push(pos);
                }
            }
        }
        open.shuffle(rng);
        walls.shuffle(rng);

        let mut layout = layout;
        let spawn = open.pop().unwrap_or_else(|| {
            // Solid noise: carve a single cell for the spawn
            layout[1][1] = 0;
            walls.retain(|pos| *pos != RawPosition::new(1, 1));
            RawPosition::new(1, 1)
        });

        let misplacement_chance = probability(self.config.misplacement_chance);
        let mut place = |rng: &mut StdRng| -> RawPosition {
            let misplaced = rng.gen_bool(misplacement_chance);
            let (first, second) = if misplaced {
                (&mut walls, &mut open)
            } else {
                (&mut open, &mut walls)
            };
            first.pop().or_else(|| second.pop()).unwrap_or(spawn)
        };

        let content = hint.content();
        let exit_position = place(rng);
        let npc_position = place(rng);
        let stone_position = place(rng);

        let mut quest_items = Vec::new();
        let mut enemies = Vec::new();
        for index in 0..hint.item_count as usize {
            let guardian_id = format!("enemy_{}", index + 1);
            quest_items.push(RawQuestItem {
                id: format!("item_{}", index + 1),
                name: content.item_names[index % content.item_names.len()].to_string(),
                position: place(rng),
                guardian_id: guardian_id.clone(),
            });
            enemies.push(RawEnemy {
                id: guardian_id,
                kind: content.guardian_kind.to_string(),
                position: place(rng),
                challenge_topic: Some(content.lesson_id.to_string()),
            });
        }

        RawPayload {
            level_number: ordinal,
            theme: hint.theme.as_str().to_string(),
            layout,
            player_spawn: spawn,
            exit_position,
            npc: RawNpc {
                name: content.npc_name.to_string(),
                position: npc_position,
                quest: content.quest.to_string(),
            },
            guiding_stone: RawGuidingStone {
                lesson_id: content.lesson_id.to_string(),
                position: stone_position,
            },
            quest_items,
            enemies,
        }
    }
}

/// Clamps a configured chance into `0.0..=1.0`; NaN counts as never.
fn probability(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl ContentProvider for OfflineProvider {
    async fn request_level(
        &self,
        ordinal: u32,
        hint: &DifficultyHint,
    ) -> Result<RawPayload, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(budget) = self.config.quota_budget {
            if call > budget {
                return Err(ProviderError::QuotaExhausted(format!(
                    "RESOURCE_EXHAUSTED: offline budget of {} request(s) spent",
                    budget
                )));
            }
        }

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| ProviderError::Recoverable("offline generator poisoned".to_string()))?;

        if rng.gen_bool(probability(self.config.failure_rate)) {
            return Err(ProviderError::Recoverable(format!(
                "simulated transient fault on request {}",
                call
            )));
        }

        let payload = self.generate(ordinal, hint, &mut rng);
        debug!(
            "Offline provider produced level {} on request {}",
            ordinal, call
        );
        Ok(payload)
    }

    fn provider_name(&self) -> &'static str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityHydrator;

    #[tokio::test]
    async fn test_offline_payloads_hydrate() {
        let provider = OfflineProvider::new(OfflineProviderConfig::new(7));
        for ordinal in 1..=6 {
            let hint = DifficultyHint::for_ordinal(ordinal);
            let payload = provider.request_level(ordinal, &hint).await.unwrap();

            assert_eq!(payload.layout.len(), hint.height);
            assert_eq!(payload.quest_items.len(), hint.item_count as usize);
            assert_eq!(payload.enemies.len(), hint.item_count as usize);

            let level = EntityHydrator::default().hydrate(payload).unwrap();
            assert_eq!(level.ordinal, ordinal);
            assert_eq!(level.theme, hint.theme);
        }
        assert_eq!(provider.calls(), 6);
    }

    #[tokio::test]
    async fn test_offline_output_is_seeded() {
        let hint = DifficultyHint::for_ordinal(2);
        let first = OfflineProvider::new(OfflineProviderConfig::new(99));
        let second = OfflineProvider::new(OfflineProviderConfig::new(99));
        assert_eq!(
            first.request_level(2, &hint).await.unwrap(),
            second.request_level(2, &hint).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_offline_quota_budget() {
        let mut config = OfflineProviderConfig::new(1);
        config.quota_budget = Some(1);
        let provider = OfflineProvider::new(config);
        let hint = DifficultyHint::for_ordinal(1);

        assert!(provider.request_level(1, &hint).await.is_ok());
        let result = provider.request_level(1, &hint).await;
        assert!(matches!(result, Err(ProviderError::QuotaExhausted(_))));
    }

    #[tokio::test]
    async fn test_offline_fault_injection() {
        let mut config = OfflineProviderConfig::new(1);
        config.failure_rate = 1.0;
        let provider = OfflineProvider::new(config);
        let result = provider
            .request_level(1, &DifficultyHint::for_ordinal(1))
            .await;
        assert!(matches!(result, Err(ProviderError::Recoverable(_))));
    }

    #[tokio::test]
    async fn test_nonsense_rates_do_not_panic() {
        let mut config = OfflineProviderConfig::new(3);
        config.failure_rate = f64::NAN;
        config.misplacement_chance = f64::NAN;
        let provider = OfflineProvider::new(config);

        let result = provider
            .request_level(1, &DifficultyHint::for_ordinal(1))
            .await;
        assert!(result.is_ok());
        assert_eq!(probability(7.5), 1.0);
        assert_eq!(probability(-1.0), 0.0);
    }
}
