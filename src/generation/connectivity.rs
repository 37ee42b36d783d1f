//! # Connectivity Validation
//!
//! Checks that every required entity of a level can be walked to from the
//! player spawn.

use crate::{reachable_from, Level, LevelforgeError, LevelforgeResult, Position};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of a failed validation, input for the repairer.
///
/// Both sets are ordered row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilitySet {
    /// Tiles connected to the spawn
    pub reachable: BTreeSet<Position>,
    /// Required entity positions missing from `reachable`
    pub unreachable: BTreeSet<Position>,
}

/// Verdict of a connectivity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityReport {
    /// Every required entity is reachable
    Valid,
    /// Some required entities are cut off
    Invalid(ReachabilitySet),
}

impl ConnectivityReport {
    /// Checks for the `Valid` verdict.
    pub fn is_valid(&self) -> bool {
        matches!(self, ConnectivityReport::Valid)
    }

    /// Unreachable targets, empty when valid.
    pub fn unreachable(&self) -> Vec<Position> {
        match self {
            ConnectivityReport::Valid => Vec::new(),
            ConnectivityReport::Invalid(set) => set.unreachable.iter().copied().collect(),
        }
    }

    /// Converts an `Invalid` verdict into an `Unreachable` error.
    pub fn ensure_valid(self) -> LevelforgeResult<()> {
        match self {
            ConnectivityReport::Valid => Ok(()),
            ConnectivityReport::Invalid(set) => Err(LevelforgeError::Unreachable(
                set.unreachable.into_iter().collect(),
            )),
        }
    }
}

/// Runs a breadth-first flood fill from the spawn and reports required
/// targets outside the reached area.
///
/// Required targets are the exit, NPC, knowledge point, every item and every
/// guardian. The verdict depends only on the grid and the entity positions.
pub fn validate_connectivity(level: &Level) -> ConnectivityReport {
    let spawn = level.player_spawn();
    let reachable = reachable_from(level.grid(), spawn);

    let unreachable: BTreeSet<Position> = level
        .required_targets()
        .into_iter()
        .filter(|target| !reachable.contains(target))
        .collect();

    if unreachable.is_empty() {
        return ConnectivityReport::Valid;
    }

    warn!(
        "Level {} failed validation: {} target(s) unreachable from spawn {}",
        level.ordinal,
        unreachable.len(),
        spawn
    );
    for target in &unreachable {
        warn!("- Unreachable at tile {}", target);
    }

    ConnectivityReport::Invalid(ReachabilitySet {
        reachable,
        unreachable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cell, Grid, PlacedEntity, Theme};

    fn level_with(grid: Grid, spawn: Position, exit: Position) -> Level {
        Level::new(
            1,
            Theme::Meadows,
            48,
            grid,
            vec![
                PlacedEntity::PlayerSpawn { position: spawn },
                PlacedEntity::ExitPoint { position: exit },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_open_grid_is_valid() {
        let level = level_with(
            Grid::filled(3, 3, Cell::Open),
            Position::new(0, 0),
            Position::new(2, 2),
        );
        assert_eq!(validate_connectivity(&level), ConnectivityReport::Valid);
    }

    #[test]
    fn test_walled_off_exit_is_invalid() {
        let grid = Grid::from_rows(&[vec![0, 1, 0], vec![0, 1, 0], vec![0, 1, 0]]).unwrap();
        let level = level_with(grid, Position::new(0, 0), Position::new(2, 1));

        match validate_connectivity(&level) {
            ConnectivityReport::Invalid(set) => {
                assert_eq!(set.reachable.len(), 3);
                assert_eq!(set.unreachable.into_iter().collect::<Vec<_>>(), vec![Position::new(2, 1)]);
            }
            ConnectivityReport::Valid => panic!("exit should be unreachable"),
        }
    }

    #[test]
    fn test_target_on_wall_is_unreachable() {
        let grid = Grid::from_rows(&[vec![0, 0, 1]]).unwrap();
        let level = level_with(grid, Position::new(0, 0), Position::new(2, 0));
        let report = validate_connectivity(&level);
        assert_eq!(report.unreachable(), vec![Position::new(2, 0)]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let grid = Grid::from_rows(&[vec![0, 1, 0], vec![0, 1, 0]]).unwrap();
        let level = level_with(grid, Position::new(0, 0), Position::new(2, 0));
        assert_eq!(validate_connectivity(&level), validate_connectivity(&level));
    }

    #[test]
    fn test_ensure_valid() {
        let grid = Grid::from_rows(&[vec![0, 1, 0]]).unwrap();
        let level = level_with(grid, Position::new(0, 0), Position::new(2, 0));

        match validate_connectivity(&level).ensure_valid() {
            Err(LevelforgeError::Unreachable(targets)) => {
                assert_eq!(targets, vec![Position::new(2, 0)]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(ConnectivityReport::Valid.ensure_valid().is_ok());
    }
}
