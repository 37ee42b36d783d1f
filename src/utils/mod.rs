//! # Utilities Module
//!
//! Grid geometry helpers shared by validation and repair.

pub mod math;
pub mod pathfinding;

pub use self::math::*;
pub use self::pathfinding::*;
