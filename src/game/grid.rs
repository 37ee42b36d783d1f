//! # Grid Topology
//!
//! Rectangular walkable/blocked tile matrix.

use crate::{LevelforgeError, LevelforgeResult, Position};
use serde::{Deserialize, Serialize};

/// State of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Walkable floor
    Open,
    /// Impassable wall
    Blocked,
}

impl Cell {
    /// Decodes the wire representation (`0` open, `1` blocked).
    pub fn from_raw(value: u8) -> Option<Cell> {
        match value {
            0 => Some(Cell::Open),
            1 => Some(Cell::Blocked),
            _ => None,
        }
    }

    /// Encodes the cell in the wire representation.
    pub fn to_raw(self) -> u8 {
        match self {
            Cell::Open => 0,
            Cell::Blocked => 1,
        }
    }

    /// Checks whether the cell can be walked on.
    pub fn is_open(self) -> bool {
        self == Cell::Open
    }
}

/// Rectangular matrix of cells addressed by `(column, row)`.
///
/// The only mutation the grid offers is [`Grid::open`], so the open set can
/// grow but never shrink once a grid has been built. Serializes as rows of
/// wire values and deserializes through [`Grid::from_rows`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates a grid where every cell has the same state.
    pub fn filled(width: usize, height: usize, cell: Cell) -> Self {
        Self {
            width,
            height,
            cells: vec![cell; width * height],
        }
    }

    /// Builds a grid from rows of wire values.
    ///
    /// Fails when the grid is empty, ragged, or contains values other than 0/1.
    ///
    /// # Examples
    ///
    /// ```
    /// use levelforge::{Grid, Position};
    ///
    /// let grid = Grid::from_rows(&[vec![0, 1], vec![0, 0]]).unwrap();
    /// assert_eq!(grid.width(), 2);
    /// assert!(!grid.is_open(Position::new(1, 0)));
    /// ```
    pub fn from_rows(rows: &[Vec<u8>]) -> LevelforgeResult<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(LevelforgeError::MalformedPayload(
                "layout has no cells".to_string(),
            ));
        }

        let mut cells = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(LevelforgeError::MalformedPayload(format!(
                    "layout row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    width
                )));
            }
            for (x, &value) in row.iter().enumerate() {
                let cell = Cell::from_raw(value).ok_or_else(|| {
                    LevelforgeError::MalformedPayload(format!(
                        "layout cell ({}, {}) has value {}, expected 0 or 1",
                        x, y, value
                    ))
                })?;
                cells.push(cell);
            }
        }

        Ok(Self {
            width,
            height: rows.len(),
            cells,
        })
    }

    /// Builds a grid from a fixed-size table; any non-zero value is blocked.
    pub fn from_table<const W: usize, const H: usize>(rows: &[[u8; W]; H]) -> Self {
        Self {
            width: W,
            height: H,
            cells: rows
                .iter()
                .flatten()
                .map(|&value| if value == 0 { Cell::Open } else { Cell::Blocked })
                .collect(),
        }
    }

    /// Converts the grid back into rows of wire values.
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|cell| cell.to_raw()).collect())
            .collect()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Checks if a position lies inside the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width + pos.x as usize)
        } else {
            None
        }
    }

    /// Gets the cell at a position, `None` when out of bounds.
    pub fn get(&self, pos: Position) -> Option<Cell> {
        self.index(pos).map(|index| self.cells[index])
    }

    /// Checks if a position is in bounds and walkable.
    pub fn is_open(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(Cell::is_open)
    }

    /// Opens a cell. Returns `true` if it was blocked before.
    ///
    /// Out-of-bounds positions are ignored.
    pub fn open(&mut self, pos: Position) -> bool {
        match self.index(pos) {
            Some(index) if self.cells[index] == Cell::Blocked => {
                self.cells[index] = Cell::Open;
                true
            }
            _ => false,
        }
    }

    /// Number of open cells.
    pub fn open_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_open()).count()
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height)
            .flat_map(move |y| (0..self.width).map(move |x| Position::new(x as i32, y as i32)))
    }

    /// All open positions in row-major order.
    pub fn open_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions().filter(move |&pos| self.is_open(pos))
    }
}

impl TryFrom<Vec<Vec<u8>>> for Grid {
    type Error = LevelforgeError;

    fn try_from(rows: Vec<Vec<u8>>) -> LevelforgeResult<Self> {
        Grid::from_rows(&rows)
    }
}

impl From<Grid> for Vec<Vec<u8>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}
