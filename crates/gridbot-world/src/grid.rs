//! Grid of cells plus the 1-based coordinates used to address it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cell::Cell;

/// A 1-based grid coordinate: `x` is the column, `y` the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, pos: Position) -> bool {
        (1..=self.width).contains(&pos.x) && (1..=self.height).contains(&pos.y)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rows of cells, top row first. Serialises as a nested integer array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    /// An all-empty grid.
    pub fn new(size: Size) -> Self {
        Self {
            rows: vec![vec![Cell::EMPTY; size.width as usize]; size.height as usize],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn height(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Width of the first row; 0 for an empty grid.
    pub fn width(&self) -> u32 {
        self.rows.first().map_or(0, |row| row.len() as u32)
    }

    /// True if the grid is rectangular with exactly these dimensions.
    pub fn has_size(&self, size: Size) -> bool {
        self.height() == size.height
            && self.rows.iter().all(|row| row.len() == size.width as usize)
    }

    pub fn get(&self, pos: Position) -> Option<Cell> {
        let (x, y) = Self::index(pos)?;
        self.rows.get(y)?.get(x).copied()
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        let (x, y) = Self::index(pos)?;
        self.rows.get_mut(y)?.get_mut(x)
    }

    /// Truncate or pad with empty cells to `size`.
    pub fn resize(&mut self, size: Size) {
        self.rows
            .resize_with(size.height as usize, Vec::new);
        for row in &mut self.rows {
            row.resize(size.width as usize, Cell::EMPTY);
        }
    }

    fn index(pos: Position) -> Option<(usize, usize)> {
        let x = pos.x.checked_sub(1)? as usize;
        let y = pos.y.checked_sub(1)? as usize;
        Some((x, y))
    }
}

impl From<Vec<Vec<i64>>> for Grid {
    fn from(rows: Vec<Vec<i64>>) -> Self {
        Self::from_rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(Cell).collect())
                .collect(),
        )
    }
}
