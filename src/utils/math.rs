//! # Line Rasterization
//!
//! Integer line algorithms used to drill corridors through the grid.

use crate::Position;

/// Rasterizes a 4-connected line from `start` to `end`, both included.
///
/// This is Bresenham's algorithm with one addition: whenever a step moves
/// along both axes, the cell reached by the horizontal half of the step is
/// emitted as well. Consecutive cells therefore always share an edge, so a
/// corridor drilled along the line is walkable with cardinal moves.
///
/// # Examples
///
/// ```
/// use levelforge::{corridor_line, Position};
///
/// let line = corridor_line(Position::new(0, 0), Position::new(2, 0));
/// assert_eq!(line, vec![Position::new(0, 0), Position::new(1, 0), Position::new(2, 0)]);
///
/// let diagonal = corridor_line(Position::new(0, 0), Position::new(1, 1));
/// assert_eq!(diagonal, vec![Position::new(0, 0), Position::new(1, 0), Position::new(1, 1)]);
/// ```
pub fn corridor_line(start: Position, end: Position) -> Vec<Position> {
    let dx = (end.x - start.x).abs();
    let dy = -(end.y - start.y).abs();
    let sx = if start.x < end.x { 1 } else { -1 };
    let sy = if start.y < end.y { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = start.x;
    let mut y = start.y;
    let mut cells = Vec::with_capacity((dx - dy + 1) as usize);

    loop {
        cells.push(Position::new(x, y));
        if x == end.x && y == end.y {
            break;
        }

        let e2 = 2 * err;
        let mut stepped_x = false;
        if e2 >= dy {
            err += dy;
            x += sx;
            stepped_x = true;
        }
        if e2 <= dx {
            err += dx;
            if stepped_x {
                cells.push(Position::new(x, y));
            }
            y += sy;
        }
    }

    cells
}
