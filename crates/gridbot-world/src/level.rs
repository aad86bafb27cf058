//! Level definitions: grid size, spawn point, tests and capability flags.
//!
//! Levels are JSON records. Missing fields fall back to the defaults a new
//! level starts with, and a level without tests gets one empty test.

use gridbot_types::AllowedConstructs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::action::AllowedFunctions;
use crate::error::LevelError;
use crate::grid::{Grid, Position, Size};
use crate::world::World;

/// Largest width or height a level can have.
pub const LEVEL_MAX_SIZE: u32 = 21;
/// Most tests a level can hold.
pub const MAX_TESTS: usize = 8;
/// File name looked up when a level path is a directory.
pub const LEVEL_FILE_NAME: &str = "level.json";

const DEFAULT_SIZE: Size = Size {
    width: 10,
    height: 2,
};

/// One starting grid and the grid that counts as solved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub shown: Grid,
    pub wanted: Grid,
}

impl TestCase {
    pub fn empty(size: Size) -> Self {
        Self {
            shown: Grid::new(size),
            wanted: Grid::new(size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    #[serde(default = "default_size")]
    pub size: Size,
    #[serde(default)]
    pub spawn: Position,
    #[serde(default)]
    pub tests: Vec<TestCase>,
    #[serde(default = "AllowedFunctions::all", alias = "allowedFunctions")]
    pub allowed_functions: AllowedFunctions,
    #[serde(default, alias = "allowedKeywords", alias = "allowed_constructs")]
    pub allowed_keywords: AllowedConstructs,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_size() -> Size {
    DEFAULT_SIZE
}

fn is_valid_size(size: Size) -> bool {
    (1..=LEVEL_MAX_SIZE).contains(&size.width) && (1..=LEVEL_MAX_SIZE).contains(&size.height)
}

fn default_version() -> String {
    "0".to_string()
}

impl Default for LevelDefinition {
    fn default() -> Self {
        Self::empty()
    }
}

impl LevelDefinition {
    /// A fresh 10x2 level: spawn at (1, 1), one empty test, everything
    /// allowed.
    pub fn empty() -> Self {
        Self {
            size: DEFAULT_SIZE,
            spawn: Position::default(),
            tests: vec![TestCase::empty(DEFAULT_SIZE)],
            allowed_functions: AllowedFunctions::all(),
            allowed_keywords: AllowedConstructs::all(),
            description: String::new(),
            version: default_version(),
        }
    }

    /// Parse and check a level record.
    pub fn from_json(text: &str) -> Result<Self, LevelError> {
        let mut level: LevelDefinition = serde_json::from_str(text)?;
        if level.tests.is_empty() {
            level.tests.push(TestCase::empty(level.size));
        }
        level.check()?;
        Ok(level)
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Verify the level is playable.
    pub fn check(&self) -> Result<(), LevelError> {
        if !is_valid_size(self.size) {
            return Err(LevelError::InvalidSize { size: self.size });
        }
        if !self.size.contains(self.spawn) {
            return Err(LevelError::SpawnOutOfBounds {
                spawn: self.spawn,
                size: self.size,
            });
        }
        if self.tests.is_empty() {
            return Err(LevelError::NoTests);
        }
        if self.tests.len() > MAX_TESTS {
            return Err(LevelError::TooManyTests);
        }
        for (index, test) in self.tests.iter().enumerate() {
            for (name, grid) in [("shown", &test.shown), ("wanted", &test.wanted)] {
                if !grid.has_size(self.size) {
                    return Err(LevelError::GridSizeMismatch {
                        test: index,
                        grid: name,
                        expected: self.size,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn test(&self, index: usize) -> Option<&TestCase> {
        self.tests.get(index)
    }

    /// The starting world of test `index`: a copy of its `shown` grid with
    /// the robot at the spawn point.
    pub fn world_for_test(&self, index: usize) -> Option<World> {
        let test = self.tests.get(index)?;
        Some(World::new(test.shown.clone(), self.spawn))
    }

    // ── Authoring ──

    /// Append an empty test and return its index.
    pub fn add_test(&mut self) -> Result<usize, LevelError> {
        if self.tests.len() >= MAX_TESTS {
            return Err(LevelError::TooManyTests);
        }
        self.tests.push(TestCase::empty(self.size));
        Ok(self.tests.len() - 1)
    }

    /// Drop every test and start over with a single empty one.
    pub fn clear_tests(&mut self) {
        self.tests = vec![TestCase::empty(self.size)];
    }

    /// Change the level size, truncating or padding every test grid.
    pub fn resize(&mut self, size: Size) -> Result<(), LevelError> {
        if !is_valid_size(size) {
            return Err(LevelError::InvalidSize { size });
        }
        for test in &mut self.tests {
            test.shown.resize(size);
            test.wanted.resize(size);
        }
        self.size = size;
        Ok(())
    }
}

/// Read a level from `path`, or from `path/level.json` if `path` is a
/// directory.
pub fn load_level(path: impl AsRef<Path>) -> Result<LevelDefinition, LevelError> {
    let path = path.as_ref();
    let file = if path.is_dir() {
        path.join(LEVEL_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let text = std::fs::read_to_string(&file).map_err(|source| LevelError::Io {
        path: file.clone(),
        source,
    })?;
    let level = LevelDefinition::from_json(&text)?;
    tracing::debug!(
        path = %file.display(),
        size = %level.size,
        tests = level.tests.len(),
        "level loaded"
    );
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_level_is_valid() {
        let level = LevelDefinition::empty();
        assert!(level.check().is_ok());
        assert_eq!(level.tests.len(), 1);
        assert!(level.tests[0].shown.has_size(Size::new(10, 2)));
    }

    #[test]
    fn add_test_stops_at_the_limit() {
        let mut level = LevelDefinition::empty();
        for expected in 1..MAX_TESTS {
            assert_eq!(level.add_test().ok(), Some(expected));
        }
        assert!(matches!(level.add_test(), Err(LevelError::TooManyTests)));
        level.clear_tests();
        assert_eq!(level.tests.len(), 1);
    }

    #[test]
    fn resize_rejects_oversized_levels() {
        let mut level = LevelDefinition::empty();
        assert!(matches!(
            level.resize(Size::new(22, 1)),
            Err(LevelError::InvalidSize { .. })
        ));
        assert!(matches!(
            level.resize(Size::new(0, 3)),
            Err(LevelError::InvalidSize { .. })
        ));
    }

    #[test]
    fn resize_keeps_tests_in_step() {
        let mut level = LevelDefinition::empty();
        level.resize(Size::new(3, 4)).expect("resize");
        assert!(level.check().is_ok());
    }
}
