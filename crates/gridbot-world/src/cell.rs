//! Grid cell bitfield.
//!
//! A cell is one `i64` whose low bits are independent flags and whose high
//! bits carry a signed number. Level files store cells as these raw integers.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Bits ──

pub const EMPTY: i64 = 0;
pub const PAINTED: i64 = 1 << 0;
pub const MARKER: i64 = 1 << 1;
pub const SHAPE_TRIANGLE: i64 = 0b01 << 2;
pub const SHAPE_SQUARE: i64 = 0b10 << 2;
pub const SHAPE_CIRCLE: i64 = 0b11 << 2;
/// Both shape bits; `cell & SHAPE_MASK` is the shape kind.
pub const SHAPE_MASK: i64 = SHAPE_CIRCLE;
pub const FILLED: i64 = 1 << 4;
pub const HOLE: i64 = 1 << 5;
pub const WINNING_SQUARE: i64 = 1 << 6;
pub const WALL: i64 = 1 << 7;
pub const NUMBER: i64 = 1 << 8;

/// Bit offset of the numeric payload.
pub const NUMBER_SHIFT: u32 = 9;
/// Smallest number a cell can hold.
pub const NUMBER_MIN: i64 = -(1 << (63 - NUMBER_SHIFT));
/// Largest number a cell can hold.
pub const NUMBER_MAX: i64 = (1 << (63 - NUMBER_SHIFT)) - 1;

/// Pack `number` into a number cell value, if it fits.
pub fn encode_number(number: i64) -> Option<i64> {
    (NUMBER_MIN..=NUMBER_MAX)
        .contains(&number)
        .then(|| NUMBER | (number << NUMBER_SHIFT))
}

/// Unpack the number stored in a cell value.
///
/// Arithmetic shift, so negative payloads come back negative.
pub fn decode_number(value: i64) -> i64 {
    (value & !NUMBER) >> NUMBER_SHIFT
}

// ── Shape ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Triangle,
    Square,
    Circle,
}

impl Shape {
    pub fn bits(self) -> i64 {
        match self {
            Shape::Triangle => SHAPE_TRIANGLE,
            Shape::Square => SHAPE_SQUARE,
            Shape::Circle => SHAPE_CIRCLE,
        }
    }

    /// The shape kind encoded in a cell value, if any.
    pub fn from_bits(value: i64) -> Option<Shape> {
        match value & SHAPE_MASK {
            SHAPE_TRIANGLE => Some(Shape::Triangle),
            SHAPE_SQUARE => Some(Shape::Square),
            SHAPE_CIRCLE => Some(Shape::Circle),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Triangle => "triangle",
            Shape::Square => "square",
            Shape::Circle => "circle",
        })
    }
}

// ── Cell ──

/// One grid square.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cell(pub i64);

impl Cell {
    pub const EMPTY: Cell = Cell(EMPTY);

    pub fn bits(self) -> i64 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == EMPTY
    }

    /// True if any bit of `flag` is set.
    pub fn has(self, flag: i64) -> bool {
        self.0 & flag != 0
    }

    pub fn shape(self) -> Option<Shape> {
        Shape::from_bits(self.0)
    }

    pub fn is_hole(self) -> bool {
        self.has(HOLE)
    }

    pub fn is_filled(self) -> bool {
        self.has(FILLED)
    }

    /// Any shape kind bit set. Holes count; only [`Item::from_cell`] tells
    /// them apart.
    ///
    /// [`Item::from_cell`]: crate::robot::Item::from_cell
    pub fn is_item(self) -> bool {
        self.shape().is_some()
    }

    /// The stored number, if this is a number cell.
    pub fn number(self) -> Option<i64> {
        self.has(NUMBER).then(|| decode_number(self.0))
    }

    /// A number cell holding `number`, if it is in range.
    pub fn with_number(number: i64) -> Option<Cell> {
        encode_number(number).map(Cell)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_round_trip_across_the_range() {
        for n in [0, 1, -1, 42, -42, 1 << 40, NUMBER_MIN, NUMBER_MAX] {
            let encoded = encode_number(n).expect("in range");
            assert_eq!(decode_number(encoded), n, "round trip of {n}");
            assert!(Cell(encoded).has(NUMBER));
        }
    }

    #[test]
    fn encoding_matches_level_file_values() {
        assert_eq!(encode_number(0), Some(256));
        assert_eq!(encode_number(3), Some(256 | (3 << 9)));
    }

    #[test]
    fn out_of_range_numbers_do_not_encode() {
        assert_eq!(encode_number(NUMBER_MAX + 1), None);
        assert_eq!(encode_number(NUMBER_MIN - 1), None);
        assert_eq!(encode_number(i64::MAX), None);
    }

    #[test]
    fn shape_bits_decode() {
        assert_eq!(Cell(SHAPE_SQUARE | FILLED).shape(), Some(Shape::Square));
        assert_eq!(Cell(SHAPE_CIRCLE | HOLE).shape(), Some(Shape::Circle));
        assert_eq!(Cell(PAINTED).shape(), None);
    }

    #[test]
    fn any_shape_bit_is_an_item() {
        assert!(Cell(SHAPE_TRIANGLE).is_item());
        assert!(Cell(SHAPE_TRIANGLE | FILLED).is_item());
        assert!(Cell(SHAPE_TRIANGLE | HOLE).is_item());
        assert!(!Cell(FILLED).is_item());
        assert!(!Cell::EMPTY.is_item());
    }

    #[test]
    fn number_reads_only_number_cells() {
        assert_eq!(Cell::with_number(-7).and_then(Cell::number), Some(-7));
        assert_eq!(Cell(MARKER).number(), None);
    }

    #[test]
    fn cell_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Cell(SHAPE_CIRCLE | HOLE)).expect("serialize");
        assert_eq!(json, "44");
        let cell: Cell = serde_json::from_str("16").expect("deserialize");
        assert_eq!(cell, Cell(FILLED));
    }
}
