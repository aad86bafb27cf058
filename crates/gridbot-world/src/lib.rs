//! gridbot world model.
//!
//! Pure data plus the robot actions that mutate it: the cell bitfield, the
//! grid, the robot, and level definitions loaded from JSON. Nothing here
//! runs programs; the evaluator calls [`World::perform`] for each action.

pub mod action;
pub mod cell;
pub mod error;
pub mod grid;
pub mod level;
pub mod robot;
pub mod world;

pub use action::{Action, AllowedFunctions};
pub use cell::{decode_number, encode_number, Cell, Shape};
pub use error::{ActionError, LevelError};
pub use grid::{Grid, Position, Size};
pub use level::{load_level, LevelDefinition, TestCase, LEVEL_MAX_SIZE, MAX_TESTS};
pub use robot::{Direction, Item, Robot};
pub use world::{ActionValue, World};
