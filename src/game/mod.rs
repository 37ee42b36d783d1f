//! # Game Module
//!
//! The level model handed to the game runtime.
//!
//! This module contains the fundamental building blocks every other part of
//! Levelforge reasons about:
//! - Tile coordinates and their pixel projection
//! - The walkable/blocked grid topology
//! - Placed entities (spawn, exit, NPC, knowledge point, items, guardians)
//! - The `Level` aggregate

pub mod entities;
pub mod grid;
pub mod level;

pub use entities::*;
pub use grid::*;
pub use level::*;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A tile coordinate: `x` is the column, `y` the row, both zero-based.
///
/// Positions order row-major (by `y`, then `x`). Reachable sets are stored
/// in that order so nearest-tile searches break ties reproducibly.
///
/// # Examples
///
/// ```
/// use levelforge::Position;
///
/// let pos = Position::new(10, 5);
/// assert_eq!(pos.x, 10);
/// assert_eq!(pos.y, 5);
///
/// assert!(Position::new(9, 0) < Position::new(0, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the origin position (0, 0).
    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Calculates the Euclidean distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::Position;
    ///
    /// let pos1 = Position::new(0, 0);
    /// let pos2 = Position::new(3, 4);
    /// assert_eq!(pos1.euclidean_distance(pos2), 5.0);
    /// ```
    pub fn euclidean_distance(self, other: Position) -> f64 {
        (self.squared_distance(other) as f64).sqrt()
    }

    /// Squared Euclidean distance, exact in integers.
    pub fn squared_distance(self, other: Position) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// Returns the 4 cardinal adjacent positions (no diagonals).
    pub fn cardinal_adjacent_positions(self) -> [Position; 4] {
        Direction::cardinal().map(|direction| self + direction.to_delta())
    }

    /// Projects this tile coordinate into pixel space.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::{PixelPosition, Position};
    ///
    /// assert_eq!(Position::new(2, 3).to_pixels(48), PixelPosition::new(96, 144));
    /// ```
    pub fn to_pixels(self, tile_size: u32) -> PixelPosition {
        let size = tile_size as i64;
        PixelPosition::new(self.x as i64 * size, self.y as i64 * size)
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Pixel-space coordinate used by the rendering side of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPosition {
    pub x: i64,
    pub y: i64,
}

impl PixelPosition {
    /// Creates a new pixel position.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Converts a direction to a position delta.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::{Direction, Position};
    ///
    /// let delta = Direction::North.to_delta();
    /// assert_eq!(delta, Position::new(0, -1));
    /// ```
    pub fn to_delta(self) -> Position {
        match self {
            Direction::North => Position::new(0, -1),
            Direction::South => Position::new(0, 1),
            Direction::East => Position::new(1, 0),
            Direction::West => Position::new(-1, 0),
        }
    }

    /// Returns the 4 cardinal directions.
    pub fn cardinal() -> [Direction; 4] {
        [
            Direction::North,
            Direction::West,
            Direction::East,
            Direction::South,
        ]
    }
}
