//! # Connectivity Repair
//!
//! Drills corridors from unreachable targets to the nearest reachable tile.

use crate::{corridor_line, Grid, Level, Position, ReachabilitySet};
use log::debug;

/// Finds the reachable tile closest to `target`.
///
/// Distance is Euclidean (compared squared, exactly). Ties go to the tile
/// that comes first in row-major order.
pub fn nearest_reachable(reachable: &ReachabilitySet, target: Position) -> Option<Position> {
    let mut best: Option<(i64, Position)> = None;
    for &candidate in &reachable.reachable {
        let distance = candidate.squared_distance(target);
        if best.map_or(true, |(best_distance, _)| distance < best_distance) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, pos)| pos)
}

/// Computes a repaired copy of the level's grid.
///
/// Every unreachable target gets a corridor to its nearest reachable tile.
/// All corridors are planned against the same reachable set and applied to
/// one copy of the grid; the level itself and its entities are untouched.
/// Cells only ever change from blocked to open.
pub fn repair_connectivity(level: &Level, reachability: &ReachabilitySet) -> Grid {
    let mut grid = level.grid().clone();

    for &target in &reachability.unreachable {
        let Some(anchor) = nearest_reachable(reachability, target) else {
            continue;
        };

        let opened = corridor_line(target, anchor)
            .into_iter()
            .filter(|&cell| grid.open(cell))
            .count();
        debug!(
            "Drilled corridor {} -> {} ({} cell(s) opened)",
            target, anchor, opened
        );
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{validate_connectivity, Cell, ConnectivityReport, PlacedEntity, Theme};
    use std::collections::BTreeSet;

    fn walled_level(rows: &[Vec<u8>], spawn: Position, exit: Position) -> Level {
        Level::new(
            1,
            Theme::Meadows,
            48,
            Grid::from_rows(rows).unwrap(),
            vec![
                PlacedEntity::PlayerSpawn { position: spawn },
                PlacedEntity::ExitPoint { position: exit },
            ],
        )
        .unwrap()
    }

    fn invalid_set(level: &Level) -> ReachabilitySet {
        match validate_connectivity(level) {
            ConnectivityReport::Invalid(set) => set,
            ConnectivityReport::Valid => panic!("expected an invalid level"),
        }
    }

    #[test]
    fn test_nearest_reachable_breaks_ties_row_major() {
        let set = ReachabilitySet {
            reachable: [Position::new(2, 1), Position::new(0, 1), Position::new(1, 0)]
                .into_iter()
                .collect(),
            unreachable: BTreeSet::new(),
        };
        // All three are at distance 1 from (1, 1); (1, 0) comes first row-major
        assert_eq!(nearest_reachable(&set, Position::new(1, 1)), Some(Position::new(1, 0)));
        assert_eq!(nearest_reachable(&set, Position::new(3, 1)), Some(Position::new(2, 1)));
    }

    #[test]
    fn test_nearest_reachable_empty_set() {
        let set = ReachabilitySet {
            reachable: BTreeSet::new(),
            unreachable: BTreeSet::new(),
        };
        assert_eq!(nearest_reachable(&set, Position::origin()), None);
    }

    #[test]
    fn test_repair_drills_through_wall() {
        let level = walled_level(
            &[vec![0, 1, 1, 0], vec![0, 1, 1, 0]],
            Position::new(0, 0),
            Position::new(3, 1),
        );
        let set = invalid_set(&level);
        let repaired = repair_connectivity(&level, &set);

        // Corridor from (3, 1) to (0, 1) along the bottom row
        assert_eq!(repaired.to_rows(), vec![vec![0, 1, 1, 0], vec![0, 0, 0, 0]]);
    }

    #[test]
    fn test_repair_does_not_touch_the_level() {
        let level = walled_level(
            &[vec![0, 1, 0]],
            Position::new(0, 0),
            Position::new(2, 0),
        );
        let before = level.clone();
        let set = invalid_set(&level);
        let _ = repair_connectivity(&level, &set);
        assert_eq!(level, before);
    }

    #[test]
    fn test_repair_only_opens_cells() {
        let level = walled_level(
            &[
                vec![0, 0, 1, 1, 1],
                vec![1, 0, 1, 0, 1],
                vec![1, 1, 1, 1, 0],
            ],
            Position::new(0, 0),
            Position::new(4, 2),
        );
        let set = invalid_set(&level);
        let repaired = repair_connectivity(&level, &set);

        for pos in level.grid().open_positions() {
            assert!(repaired.is_open(pos));
        }
        assert!(repaired.open_count() > level.grid().open_count());
    }

    #[test]
    fn test_repair_plans_against_one_reachable_set() {
        // Two sealed targets; each corridor runs to the spawn room, not to the other corridor
        let mut grid = Grid::filled(5, 1, Cell::Blocked);
        grid.open(Position::new(2, 0));
        let level = Level::new(
            1,
            Theme::Meadows,
            48,
            grid,
            vec![
                PlacedEntity::PlayerSpawn { position: Position::new(2, 0) },
                PlacedEntity::ExitPoint { position: Position::new(0, 0) },
                PlacedEntity::KnowledgePoint(crate::KnowledgePoint {
                    lesson_id: "articles_a_an".to_string(),
                    position: Position::new(4, 0),
                }),
            ],
        )
        .unwrap();

        let set = invalid_set(&level);
        assert_eq!(set.unreachable.len(), 2);
        let repaired = repair_connectivity(&level, &set);
        assert_eq!(repaired.open_count(), 5);
    }
}
