//! Robot actions and the per-level switch that exposes them to programs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One robot operation a program can call by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Column,
    Line,
    OnPainted,
    Paint,
    Grab,
    Release,
    ReadNumber,
    WriteNumber,
    OnItem,
    OnHole,
    OnTriangle,
    OnSquare,
    OnCircle,
    OnFilledShape,
    OnDottedShape,
}

impl Action {
    pub const ALL: [Action; 19] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Column,
        Action::Line,
        Action::OnPainted,
        Action::Paint,
        Action::Grab,
        Action::Release,
        Action::ReadNumber,
        Action::WriteNumber,
        Action::OnItem,
        Action::OnHole,
        Action::OnTriangle,
        Action::OnSquare,
        Action::OnCircle,
        Action::OnFilledShape,
        Action::OnDottedShape,
    ];

    /// The name programs call and level files key this action by.
    pub fn name(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::Column => "column",
            Action::Line => "line",
            Action::OnPainted => "on_painted",
            Action::Paint => "paint",
            Action::Grab => "grab",
            Action::Release => "release",
            Action::ReadNumber => "read_number",
            Action::WriteNumber => "write_number",
            Action::OnItem => "on_item",
            Action::OnHole => "on_hole",
            Action::OnTriangle => "on_triangle",
            Action::OnSquare => "on_square",
            Action::OnCircle => "on_circle",
            Action::OnFilledShape => "on_filled_shape",
            Action::OnDottedShape => "on_dotted_shape",
        }
    }

    pub fn from_name(name: &str) -> Option<Action> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Number of arguments the action takes.
    pub fn arity(self) -> usize {
        match self {
            Action::WriteNumber => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which actions a level exposes, keyed by action name.
///
/// Actions missing from the map are allowed; unknown keys are kept so a
/// level round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowedFunctions(BTreeMap<String, bool>);

impl AllowedFunctions {
    /// Every action explicitly enabled, as a new level starts out.
    pub fn all() -> Self {
        Self(
            Action::ALL
                .into_iter()
                .map(|a| (a.name().to_string(), true))
                .collect(),
        )
    }

    pub fn allows(&self, action: Action) -> bool {
        self.0.get(action.name()).copied().unwrap_or(true)
    }

    pub fn set(&mut self, action: Action, allowed: bool) {
        self.0.insert(action.name().to_string(), allowed);
    }

    #[must_use]
    pub fn with(mut self, action: Action, allowed: bool) -> Self {
        self.set(action, allowed);
        self
    }

    /// The actions a program may call, in declaration order.
    pub fn allowed(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|a| self.allows(*a))
    }
}
