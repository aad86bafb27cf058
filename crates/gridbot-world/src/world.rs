//! The mutable state of one run and the robot actions that change it.
//!
//! Actions either succeed or fail with an [`ActionError`] and leave the world
//! unchanged. Movement is checked against the grid bounds only; walls are
//! scenery.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::cell::{Cell, Shape, FILLED, MARKER, PAINTED, WINNING_SQUARE};
use crate::error::ActionError;
use crate::grid::{Grid, Position, Size};
use crate::robot::{Direction, Item, Robot};

/// What an action hands back to the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionValue {
    None,
    Int(i64),
    Bool(bool),
}

/// A grid with a robot on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub grid: Grid,
    pub robot: Robot,
}

impl World {
    pub fn new(grid: Grid, spawn: Position) -> Self {
        Self {
            grid,
            robot: Robot::spawn(spawn),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.grid.width(), self.grid.height())
    }

    /// The cell under the robot; an off-grid robot stands on nothing.
    pub fn current_cell(&self) -> Cell {
        self.grid.get(self.robot.position).unwrap_or_default()
    }

    fn set_current_cell(&mut self, cell: Cell) {
        if let Some(slot) = self.grid.get_mut(self.robot.position) {
            *slot = cell;
        }
    }

    /// Success: standing on the winning square, or the grid matches `wanted`.
    pub fn is_success(&self, wanted: &Grid) -> bool {
        self.current_cell() == Cell(WINNING_SQUARE) || &self.grid == wanted
    }

    /// Run `action` with integer `args`.
    pub fn perform(&mut self, action: Action, args: &[i64]) -> Result<ActionValue, ActionError> {
        if args.len() != action.arity() {
            return Err(ActionError::WrongArity {
                action,
                expected: action.arity(),
                given: args.len(),
            });
        }
        let value = match action {
            Action::Up => self.step(Direction::Up).map(|()| ActionValue::None)?,
            Action::Down => self.step(Direction::Down).map(|()| ActionValue::None)?,
            Action::Left => self.step(Direction::Left).map(|()| ActionValue::None)?,
            Action::Right => self.step(Direction::Right).map(|()| ActionValue::None)?,
            Action::Column => ActionValue::Int(i64::from(self.column())),
            Action::Line => ActionValue::Int(i64::from(self.line())),
            Action::OnPainted => ActionValue::Bool(self.on_painted()),
            Action::Paint => self.paint().map(|()| ActionValue::None)?,
            Action::Grab => self.grab().map(|()| ActionValue::None)?,
            Action::Release => self.release().map(|()| ActionValue::None)?,
            Action::ReadNumber => ActionValue::Int(self.read_number()?),
            Action::WriteNumber => {
                let number = args.first().copied().unwrap_or_default();
                self.write_number(number).map(|()| ActionValue::None)?
            }
            Action::OnItem => ActionValue::Bool(self.on_item()),
            Action::OnHole => ActionValue::Bool(self.on_hole()),
            Action::OnTriangle => ActionValue::Bool(self.on_shape(Shape::Triangle)),
            Action::OnSquare => ActionValue::Bool(self.on_shape(Shape::Square)),
            Action::OnCircle => ActionValue::Bool(self.on_shape(Shape::Circle)),
            Action::OnFilledShape => ActionValue::Bool(self.on_filled_shape()),
            Action::OnDottedShape => ActionValue::Bool(self.on_dotted_shape()),
        };
        Ok(value)
    }

    // ── Movement ──

    /// Move one cell and face that way.
    pub fn step(&mut self, direction: Direction) -> Result<(), ActionError> {
        let Position { x, y } = self.robot.position;
        let target = match direction {
            Direction::Up => y.checked_sub(1).map(|y| Position::new(x, y)),
            Direction::Down => Some(Position::new(x, y + 1)),
            Direction::Left => x.checked_sub(1).map(|x| Position::new(x, y)),
            Direction::Right => Some(Position::new(x + 1, y)),
        };
        match target {
            Some(pos) if self.size().contains(pos) => {
                self.robot.position = pos;
                self.robot.facing = direction;
                Ok(())
            }
            _ => Err(ActionError::OutOfBounds),
        }
    }

    pub fn column(&self) -> u32 {
        self.robot.position.x
    }

    pub fn line(&self) -> u32 {
        self.robot.position.y
    }

    // ── Paint ──

    pub fn on_painted(&self) -> bool {
        self.current_cell() == Cell(PAINTED)
    }

    pub fn paint(&mut self) -> Result<(), ActionError> {
        if self.current_cell() != Cell(MARKER) {
            return Err(ActionError::UnmarkedSquare);
        }
        self.set_current_cell(Cell(PAINTED));
        Ok(())
    }

    // ── Items ──

    pub fn grab(&mut self) -> Result<(), ActionError> {
        if self.robot.holding.is_some() {
            return Err(ActionError::AlreadyHolding);
        }
        let item = Item::from_cell(self.current_cell()).ok_or(ActionError::NothingToGrab)?;
        self.robot.holding = Some(item);
        self.set_current_cell(Cell::EMPTY);
        Ok(())
    }

    /// Put down what the robot holds.
    ///
    /// An empty cell becomes a filled cell. A hole is filled when the held
    /// shape matches the hole's shape; fill state is ignored and an empty
    /// hand matches nothing.
    pub fn release(&mut self) -> Result<(), ActionError> {
        let cell = self.current_cell();
        if cell.is_empty() {
            self.set_current_cell(Cell(FILLED));
            self.robot.holding = None;
            return Ok(());
        }
        if !cell.is_hole() {
            return Err(ActionError::CannotRelease);
        }
        if cell.is_filled() {
            return Err(ActionError::HoleAlreadyFilled);
        }
        match self.robot.holding {
            Some(item) if cell.shape() == Some(item.shape) => {
                self.set_current_cell(Cell(cell.bits() | FILLED));
                self.robot.holding = None;
                Ok(())
            }
            _ => Err(ActionError::ShapeMismatch),
        }
    }

    /// True on any shape, holes included.
    pub fn on_item(&self) -> bool {
        self.current_cell().is_item()
    }

    pub fn on_hole(&self) -> bool {
        self.current_cell().is_hole()
    }

    /// True if the cell's shape kind is `shape`, hole or not.
    pub fn on_shape(&self, shape: Shape) -> bool {
        self.current_cell().shape() == Some(shape)
    }

    pub fn on_filled_shape(&self) -> bool {
        self.on_item() && self.current_cell().is_filled()
    }

    pub fn on_dotted_shape(&self) -> bool {
        self.on_item() && !self.current_cell().is_filled()
    }

    // ── Numbers ──

    pub fn read_number(&self) -> Result<i64, ActionError> {
        self.current_cell().number().ok_or(ActionError::NoNumber)
    }

    /// Store `number` on an empty or number cell.
    pub fn write_number(&mut self, number: i64) -> Result<(), ActionError> {
        let cell = self.current_cell();
        if !cell.is_empty() && cell.number().is_none() {
            return Err(ActionError::CannotWriteNumber);
        }
        let written = Cell::with_number(number).ok_or(ActionError::NumberOutOfRange(number))?;
        self.set_current_cell(written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{
        encode_number, HOLE, NUMBER_MAX, SHAPE_CIRCLE, SHAPE_SQUARE, SHAPE_TRIANGLE, WALL,
    };

    fn world(rows: Vec<Vec<i64>>, x: u32, y: u32) -> World {
        World::new(Grid::from(rows), Position::new(x, y))
    }

    #[test]
    fn left_moves_and_turns() {
        let mut w = world(vec![vec![0, 0, 0]], 3, 1);
        w.step(Direction::Left).expect("move");
        assert_eq!(w.robot.position, Position::new(2, 1));
        assert_eq!(w.robot.facing, Direction::Left);
    }

    #[test]
    fn leaving_the_grid_fails_and_keeps_position() {
        let mut w = world(vec![vec![0, 0], vec![0, 0]], 1, 1);
        assert_eq!(w.step(Direction::Left), Err(ActionError::OutOfBounds));
        assert_eq!(w.step(Direction::Up), Err(ActionError::OutOfBounds));
        assert_eq!(w.robot.position, Position::new(1, 1));
        assert_eq!(w.robot.facing, Direction::Right);
        w.step(Direction::Down).expect("down");
        assert_eq!(w.step(Direction::Down), Err(ActionError::OutOfBounds));
    }

    #[test]
    fn walls_do_not_block() {
        let mut w = world(vec![vec![0, WALL]], 1, 1);
        assert_eq!(w.step(Direction::Right), Ok(()));
    }

    #[test]
    fn paint_needs_a_marker() {
        let mut w = world(vec![vec![MARKER, 0]], 1, 1);
        assert!(!w.on_painted());
        w.paint().expect("paint marker");
        assert!(w.on_painted());
        assert_eq!(w.paint(), Err(ActionError::UnmarkedSquare));
    }

    #[test]
    fn grab_rules() {
        let mut w = world(vec![vec![SHAPE_SQUARE | FILLED, SHAPE_TRIANGLE, 0]], 1, 1);
        w.grab().expect("grab");
        assert_eq!(
            w.robot.holding,
            Some(Item {
                shape: Shape::Square,
                filled: true
            })
        );
        assert_eq!(w.current_cell(), Cell::EMPTY);
        w.step(Direction::Right).expect("move");
        assert_eq!(w.grab(), Err(ActionError::AlreadyHolding));
        w.robot.holding = None;
        w.step(Direction::Right).expect("move");
        assert_eq!(w.grab(), Err(ActionError::NothingToGrab));
    }

    #[test]
    fn holes_cannot_be_grabbed() {
        let mut w = world(vec![vec![SHAPE_CIRCLE | HOLE]], 1, 1);
        assert_eq!(w.grab(), Err(ActionError::NothingToGrab));
    }

    #[test]
    fn release_into_matching_hole_ignores_fill_state() {
        let mut w = world(vec![vec![SHAPE_TRIANGLE, SHAPE_TRIANGLE | HOLE]], 1, 1);
        w.grab().expect("grab");
        w.step(Direction::Right).expect("move");
        w.release().expect("release");
        assert_eq!(w.current_cell(), Cell(SHAPE_TRIANGLE | HOLE | FILLED));
        assert_eq!(w.robot.holding, None);
    }

    #[test]
    fn release_into_mismatched_hole_changes_nothing() {
        let mut w = world(vec![vec![SHAPE_SQUARE, SHAPE_CIRCLE | HOLE]], 1, 1);
        w.grab().expect("grab");
        w.step(Direction::Right).expect("move");
        let before = w.clone();
        assert_eq!(w.release(), Err(ActionError::ShapeMismatch));
        assert_eq!(w, before);
    }

    #[test]
    fn release_other_cases() {
        let mut w = world(vec![vec![SHAPE_SQUARE | HOLE | FILLED, MARKER, 0]], 1, 1);
        w.robot.holding = Some(Item {
            shape: Shape::Square,
            filled: false,
        });
        assert_eq!(w.release(), Err(ActionError::HoleAlreadyFilled));
        w.step(Direction::Right).expect("move");
        assert_eq!(w.release(), Err(ActionError::CannotRelease));
        w.step(Direction::Right).expect("move");
        w.release().expect("release on empty");
        assert_eq!(w.current_cell(), Cell(FILLED));
        assert_eq!(w.robot.holding, None);
    }

    #[test]
    fn empty_hand_never_fills_a_hole() {
        let mut w = world(vec![vec![SHAPE_TRIANGLE | HOLE]], 1, 1);
        assert_eq!(w.release(), Err(ActionError::ShapeMismatch));
    }

    #[test]
    fn shape_queries() {
        let w = world(vec![vec![SHAPE_CIRCLE | HOLE]], 1, 1);
        assert!(w.on_shape(Shape::Circle));
        assert!(w.on_hole());
        assert!(w.on_item());
        assert!(!w.on_filled_shape());
        assert!(w.on_dotted_shape());

        let w = world(vec![vec![SHAPE_CIRCLE | HOLE | FILLED]], 1, 1);
        assert!(w.on_item());
        assert!(w.on_filled_shape());
        assert!(!w.on_dotted_shape());

        let w = world(vec![vec![FILLED]], 1, 1);
        assert!(!w.on_item());
        assert!(!w.on_filled_shape());

        let w = world(vec![vec![SHAPE_TRIANGLE]], 1, 1);
        assert!(w.on_item());
        assert!(w.on_dotted_shape());
        assert!(w.on_shape(Shape::Triangle));
        assert!(!w.on_shape(Shape::Square));
    }

    #[test]
    fn numbers() {
        let mut w = world(vec![vec![0, MARKER]], 1, 1);
        assert_eq!(w.read_number(), Err(ActionError::NoNumber));
        w.write_number(-12).expect("write on empty");
        assert_eq!(w.read_number(), Ok(-12));
        w.write_number(40).expect("overwrite number");
        assert_eq!(w.current_cell(), Cell(encode_number(40).unwrap_or_default()));
        assert_eq!(
            w.write_number(NUMBER_MAX + 1),
            Err(ActionError::NumberOutOfRange(NUMBER_MAX + 1))
        );
        w.step(Direction::Right).expect("move");
        assert_eq!(w.write_number(1), Err(ActionError::CannotWriteNumber));
    }

    #[test]
    fn perform_dispatches_and_checks_arity() {
        let mut w = world(vec![vec![0, 0]], 1, 1);
        assert_eq!(w.perform(Action::Right, &[]), Ok(ActionValue::None));
        assert_eq!(w.perform(Action::Column, &[]), Ok(ActionValue::Int(2)));
        assert_eq!(w.perform(Action::WriteNumber, &[5]), Ok(ActionValue::None));
        assert_eq!(w.perform(Action::ReadNumber, &[]), Ok(ActionValue::Int(5)));
        assert_eq!(
            w.perform(Action::Up, &[1]),
            Err(ActionError::WrongArity {
                action: Action::Up,
                expected: 0,
                given: 1
            })
        );
        assert_eq!(
            w.perform(Action::WriteNumber, &[]).map_err(|e| e.to_string()),
            Err("write_number() takes 1 argument(s) (0 given)".to_string())
        );
    }

    #[test]
    fn success_conditions() {
        let wanted = Grid::from(vec![vec![FILLED, 0]]);
        let w = world(vec![vec![FILLED, 0]], 2, 1);
        assert!(w.is_success(&wanted));
        let w = world(vec![vec![0, WINNING_SQUARE]], 2, 1);
        assert!(w.is_success(&wanted));
        let w = world(vec![vec![0, WINNING_SQUARE]], 1, 1);
        assert!(!w.is_success(&wanted));
    }
}
