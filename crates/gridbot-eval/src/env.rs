//! Variable environment: module globals plus one frame per active call.

use std::collections::{BTreeSet, HashMap};

use crate::value::Value;

/// Locals of one user function call.
#[derive(Debug, Default)]
struct Frame {
    locals: HashMap<String, Value>,
    /// Names the function declared `global`.
    globals: BTreeSet<String>,
}

/// Name lookup goes local, then global. Assignment inside a function binds
/// a local unless the name was declared `global` there.
#[derive(Debug, Default)]
pub struct Environment {
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active user function calls.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(frame) = self.frames.last() {
            if !frame.globals.contains(name) {
                if let Some(value) = frame.locals.get(name) {
                    return Some(value);
                }
            }
        }
        self.globals.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) if !frame.globals.contains(name) => {
                frame.locals.insert(name.to_string(), value);
            }
            _ => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    /// `global name` in the current call. A no-op at module level.
    pub fn declare_global(&mut self, name: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.remove(name);
            frame.globals.insert(name.to_string());
        }
    }
}
