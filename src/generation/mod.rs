//! # Generation Module
//!
//! Turns raw provider payloads into connected, playable levels.
//!
//! The pipeline is hydration, connectivity validation, corridor repair and,
//! when all else fails, the bundled fallback level. The orchestrator ties the
//! stages together and bounds how often each one may run.

pub mod connectivity;
pub mod fallback;
pub mod hydrator;
pub mod orchestrator;
pub mod payload;
pub mod repair;

pub use connectivity::*;
pub use fallback::*;
pub use hydrator::*;
pub use orchestrator::*;
pub use payload::*;
pub use repair::*;

use crate::config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the synthesis orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Delay after the first failed attempt; doubles after each later one
    pub backoff_base: Duration,
    /// Tile edge length used for pixel coordinates
    pub tile_size: u32,
}

impl SynthesisConfig {
    /// Creates a configuration with the given backoff base.
    pub fn new(backoff_base: Duration) -> Self {
        Self {
            backoff_base,
            tile_size: config::TILE_SIZE,
        }
    }

    /// Creates a configuration without backoff delays.
    pub fn for_testing() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::SynthesisConfig;
    /// use std::time::Duration;
    ///
    /// let config = SynthesisConfig::new(Duration::from_millis(1000));
    /// assert_eq!(config.backoff_for(1), Duration::from_millis(1000));
    /// assert_eq!(config.backoff_for(2), Duration::from_millis(2000));
    /// ```
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1 << exponent)
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(config::DEFAULT_BACKOFF_MS))
    }
}
