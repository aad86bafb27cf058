//! Robot state: where it stands, which way it faces, what it carries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cell::{Cell, Shape, FILLED};
use crate::grid::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        })
    }
}

/// A shape the robot can carry: one of six shape/fill combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub shape: Shape,
    pub filled: bool,
}

impl Item {
    /// The item lying on `cell`, if the cell holds one. Holes hold nothing.
    pub fn from_cell(cell: Cell) -> Option<Item> {
        if !cell.is_item() || cell.is_hole() {
            return None;
        }
        Some(Item {
            shape: cell.shape()?,
            filled: cell.is_filled(),
        })
    }

    /// The cell value of this item lying on the floor.
    pub fn cell(self) -> Cell {
        let fill = if self.filled { FILLED } else { 0 };
        Cell(self.shape.bits() | fill)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fill = if self.filled { "filled" } else { "dotted" };
        write!(f, "{fill} {}", self.shape)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    pub position: Position,
    pub facing: Direction,
    pub holding: Option<Item>,
}

impl Robot {
    /// A robot at `spawn`, facing right, empty-handed.
    pub fn spawn(position: Position) -> Self {
        Self {
            position,
            facing: Direction::Right,
            holding: None,
        }
    }
}
