//! # Levelforge
//!
//! Procedural level synthesis for a tile-based exploration game, with
//! connectivity validation and automatic repair.
//!
//! ## Architecture Overview
//!
//! Levels come from an unreliable content source (usually a language model).
//! Before a level reaches the game runtime, Levelforge makes sure every
//! essential element can actually be walked to from the player spawn:
//!
//! - **Game Model**: grid topology, positions, placed entities and the `Level` aggregate
//! - **Generation**: hydration of raw payloads, connectivity validation and repair,
//!   the canonical fallback level and the synthesis orchestrator
//! - **LLDM**: the content provider seam, prompt rendering and concrete providers
//! - **Utilities**: line rasterization and grid reachability
//!
//! ## Failure Model
//!
//! Every request ends with a playable level. Broken payloads are repaired or
//! retried a bounded number of times; when the provider is exhausted the
//! orchestrator hands out the bundled fallback level instead of an error.

pub mod game;
pub mod generation;
pub mod lldm;
pub mod utils;

// Core module re-exports
pub use game::*;
pub use generation::*;
pub use lldm::*;
pub use utils::*;

/// Core error type for the Levelforge engine.
#[derive(thiserror::Error, Debug)]
pub enum LevelforgeError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Raw payload is structurally unusable
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Level violates a construction invariant
    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    /// Required entities cannot be reached from the spawn
    #[error("{} required target(s) unreachable from spawn", .0.len())]
    Unreachable(Vec<Position>),

    /// Repair loop gave up without producing a connected level
    #[error("Level still disconnected after {iterations} validation passes")]
    RepairExhausted { iterations: u32 },

    /// Content provider failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The caller cancelled the synthesis request
    #[error("Synthesis cancelled")]
    Cancelled,
}

/// Result type used throughout the Levelforge codebase.
pub type LevelforgeResult<T> = Result<T, LevelforgeError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine configuration constants.
///
/// The attempt caps are deliberately constants rather than configuration so
/// that every synthesis request is guaranteed to terminate.
pub mod config {
    /// Edge length of one tile in pixels
    pub const TILE_SIZE: u32 = 48;

    /// Default grid width requested from providers
    pub const DEFAULT_GRID_WIDTH: usize = 20;

    /// Default grid height requested from providers
    pub const DEFAULT_GRID_HEIGHT: usize = 15;

    /// Provider round trips per synthesis request
    pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

    /// Validation passes per candidate level
    pub const MAX_REPAIR_ITERATIONS: u32 = 5;

    /// Delay before the second generation attempt, doubled afterwards
    pub const DEFAULT_BACKOFF_MS: u64 = 1000;

    /// Guardian patrol range in tiles
    pub const GUARDIAN_PATROL_TILES: u32 = 2;
}
