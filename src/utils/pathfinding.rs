//! # Grid Reachability
//!
//! Flood fill over open cells with cardinal moves.

use crate::{Grid, Position};
use ::pathfinding::prelude::bfs_reach;
use std::collections::BTreeSet;

/// Collects every open cell reachable from `start` with cardinal moves.
///
/// The result is ordered row-major. A blocked or out-of-bounds `start`
/// reaches nothing.
pub fn reachable_from(grid: &Grid, start: Position) -> BTreeSet<Position> {
    if !grid.is_open(start) {
        return BTreeSet::new();
    }

    bfs_reach(start, |&pos| {
        pos.cardinal_adjacent_positions()
            .into_iter()
            .filter(|&next| grid.is_open(next))
            .collect::<Vec<_>>()
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachable_open_room() {
        let grid = Grid::from_rows(&[vec![0, 0], vec![0, 0]]).unwrap();
        assert_eq!(reachable_from(&grid, Position::origin()).len(), 4);
    }

    #[test]
    fn test_reachable_ignores_diagonal_gaps() {
        let grid = Grid::from_rows(&[vec![0, 1], vec![1, 0]]).unwrap();
        let reached = reachable_from(&grid, Position::origin());
        assert_eq!(reached.into_iter().collect::<Vec<_>>(), vec![Position::origin()]);
    }

    #[test]
    fn test_reachable_from_blocked_start() {
        let grid = Grid::from_rows(&[vec![1, 0]]).unwrap();
        assert!(reachable_from(&grid, Position::origin()).is_empty());
    }

    #[test]
    fn test_reachable_stops_at_walls() {
        let grid = Grid::from_rows(&[vec![0, 0, 1, 0], vec![0, 1, 1, 0], vec![0, 0, 1, 0]]).unwrap();
        let reached = reachable_from(&grid, Position::origin());
        assert_eq!(reached.len(), 5);
        assert!(!reached.contains(&Position::new(3, 0)));
    }
}
