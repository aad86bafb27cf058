//! Runtime values.
//!
//! Lists, dicts and sets are shared through `Rc<RefCell<..>>` so that two
//! names bound to the same collection see each other's changes. Values never
//! leave the worker thread; the driver only sees world snapshots.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use gridbot_types::ast::FunctionDef;
use gridbot_world::Action;

use crate::budget::Budget;
use crate::builtins::Builtin;
use crate::error::{EvalResult, FaultKind, RuntimeFault};

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<BTreeMap<Key, Value>>>;
pub type SetRef = Rc<RefCell<BTreeSet<Key>>>;

#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    List(ListRef),
    Dict(DictRef),
    Set(SetRef),
    /// `range(start, stop, step)`, iterated lazily.
    Range(Range),
    Function(Rc<FunctionDef>),
    Builtin(Builtin),
    Action(Action),
}

/// A hashable value: dict key or set element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl Range {
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            i128::from(self.stop) - i128::from(self.start)
        } else {
            i128::from(self.start) - i128::from(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        let step = i128::from(self.step).abs();
        usize::try_from((span + step - 1) / step).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let value = i128::from(self.start) + i128::from(self.step) * index as i128;
        i64::try_from(value).ok()
    }

    pub fn contains(&self, n: i64) -> bool {
        let offset = i128::from(n) - i128::from(self.start);
        let step = i128::from(self.step);
        offset % step == 0 && (offset / step) >= 0 && ((offset / step) as usize) < self.len()
    }
}

impl Value {
    pub fn str(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: BTreeMap<Key, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn set(items: BTreeSet<Key>) -> Value {
        Value::Set(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) | Value::Action(_) => "builtin_function_or_method",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            Value::Set(items) => !items.borrow().is_empty(),
            Value::Range(range) => !range.is_empty(),
            Value::Function(_) | Value::Builtin(_) | Value::Action(_) => true,
        }
    }

    /// The integer behind an int or bool.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn expect_int(&self, context: &str) -> EvalResult<i64> {
        self.as_int().ok_or_else(|| {
            RuntimeFault::type_error(format!(
                "{context} expected an int, got '{}'",
                self.type_name()
            ))
        })
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::None => Value::None,
            Key::Bool(b) => Value::Bool(b),
            Key::Int(n) => Value::Int(n),
            Key::Str(s) => Value::Str(s),
        }
    }
}

impl TryFrom<&Value> for Key {
    type Error = RuntimeFault;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::None => Ok(Key::None),
            Value::Bool(b) => Ok(Key::Bool(*b)),
            Value::Int(n) => Ok(Key::Int(*n)),
            Value::Str(s) => Ok(Key::Str(s.clone())),
            other => Err(RuntimeFault::type_error(format!(
                "unhashable type: '{}'",
                other.type_name()
            ))),
        }
    }
}

impl Key {
    pub fn repr(&self) -> String {
        Value::from(self.clone()).repr()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Equality & Ordering
// ══════════════════════════════════════════════════════════════════════════════

/// How deep comparisons and display follow nested collections.
const MAX_NESTING: usize = 64;
/// Longest text `repr()` and `Display` produce before eliding the rest.
const PREVIEW_LEN: usize = 200;

/// `==`. Bools compare as integers. Every element visited is charged to
/// `budget`.
pub fn values_equal(left: &Value, right: &Value, budget: &Budget) -> EvalResult<bool> {
    equal_at(left, right, 0, budget)
}

fn equal_at(left: &Value, right: &Value, depth: usize, budget: &Budget) -> EvalResult<bool> {
    if depth > MAX_NESTING {
        return Ok(false);
    }
    budget.charge(1)?;
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return Ok(a == b);
    }
    match (left, right) {
        (Value::None, Value::None) => Ok(true),
        (Value::Str(a), Value::Str(b)) => Ok(a == b),
        (Value::List(a), Value::List(b)) => {
            if Rc::ptr_eq(a, b) {
                return Ok(true);
            }
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return Ok(false);
            }
            for (x, y) in a.iter().zip(b.iter()) {
                if !equal_at(x, y, depth + 1, budget)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Value::Dict(a), Value::Dict(b)) => {
            if Rc::ptr_eq(a, b) {
                return Ok(true);
            }
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return Ok(false);
            }
            for (k, v) in a.iter() {
                match b.get(k) {
                    Some(w) if equal_at(v, w, depth + 1, budget)? => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        (Value::Set(a), Value::Set(b)) => {
            if Rc::ptr_eq(a, b) {
                return Ok(true);
            }
            let (a, b) = (a.borrow(), b.borrow());
            budget.charge(a.len())?;
            Ok(*a == *b)
        }
        (Value::Range(a), Value::Range(b)) => Ok(a == b),
        (Value::Function(a), Value::Function(b)) => Ok(Rc::ptr_eq(a, b)),
        (Value::Builtin(a), Value::Builtin(b)) => Ok(a == b),
        (Value::Action(a), Value::Action(b)) => Ok(a == b),
        _ => Ok(false),
    }
}

/// Ordering for `<` and friends: ints, strings, and lists of comparable items.
pub fn compare_values(left: &Value, right: &Value, budget: &Budget) -> EvalResult<Ordering> {
    compare_at(left, right, 0, budget)
}

fn compare_at(left: &Value, right: &Value, depth: usize, budget: &Budget) -> EvalResult<Ordering> {
    if depth > MAX_NESTING {
        return Err(RuntimeFault::new(
            FaultKind::RecursionError,
            "maximum recursion depth exceeded in comparison",
        ));
    }
    budget.charge(1)?;
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return Ok(a.cmp(&b));
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_at(x, y, depth + 1, budget)?;
                if ord != Ordering::Equal {
                    return Ok(ord);
                }
            }
            Ok(a.len().cmp(&b.len()))
        }
        _ => Err(RuntimeFault::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

/// Rendering stopped at the length cap.
struct Overflow;

/// Rendered text with a cap on its length in bytes.
struct Text {
    out: String,
    cap: usize,
}

impl Text {
    fn new(cap: usize) -> Self {
        Self {
            out: String::new(),
            cap,
        }
    }

    /// Append `s`, keeping whatever fits when it would pass the cap.
    fn push(&mut self, s: &str) -> Result<(), Overflow> {
        let room = self.cap.saturating_sub(self.out.len());
        if s.len() <= room {
            self.out.push_str(s);
            return Ok(());
        }
        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.out.push_str(&s[..end]);
        Err(Overflow)
    }
}

fn push_quoted(text: &mut Text, s: &str) -> Result<(), Overflow> {
    text.push("'")?;
    for c in s.chars() {
        match c {
            '\'' => text.push("\\'")?,
            '\\' => text.push("\\\\")?,
            '\n' => text.push("\\n")?,
            '\t' => text.push("\\t")?,
            c => text.push(c.encode_utf8(&mut [0; 4]))?,
        }
    }
    text.push("'")
}

fn push_items<I>(
    text: &mut Text,
    items: impl Iterator<Item = I>,
    mut each: impl FnMut(&mut Text, I) -> Result<(), Overflow>,
) -> Result<(), Overflow> {
    for (i, item) in items.enumerate() {
        if i > 0 {
            text.push(", ")?;
        }
        each(text, item)?;
    }
    Ok(())
}

impl Value {
    /// The `repr()` form: strings quoted. Long text is cut short with
    /// `...`; this is the form used in fault messages.
    pub fn repr(&self) -> String {
        self.preview(true)
    }

    fn preview(&self, quoted: bool) -> String {
        let mut text = Text::new(PREVIEW_LEN);
        if self.render(&mut text, quoted, 0).is_err() {
            text.out.push_str("...");
        }
        text.out
    }

    /// The whole `str()` (or, with `quoted`, `repr()`) text a program asks
    /// for. Text longer than the size limit is a `MemoryError`.
    pub fn to_text(&self, quoted: bool, budget: &Budget) -> EvalResult<String> {
        let mut text = Text::new(budget.max_len());
        if self.render(&mut text, quoted, 0).is_err() {
            return Err(RuntimeFault::too_large(budget.max_len()));
        }
        budget.charge(text.out.len())?;
        Ok(text.out)
    }

    fn render(&self, text: &mut Text, quoted: bool, depth: usize) -> Result<(), Overflow> {
        let nested = matches!(self, Value::List(_) | Value::Dict(_) | Value::Set(_));
        if nested && depth > MAX_NESTING {
            return text.push("...");
        }
        match self {
            Value::None => text.push("None"),
            Value::Bool(true) => text.push("True"),
            Value::Bool(false) => text.push("False"),
            Value::Int(n) => text.push(&n.to_string()),
            Value::Str(s) if quoted => push_quoted(text, s),
            Value::Str(s) => text.push(s),
            Value::List(items) => {
                text.push("[")?;
                push_items(text, items.borrow().iter(), |text, v| {
                    v.render(text, true, depth + 1)
                })?;
                text.push("]")
            }
            Value::Dict(entries) => {
                text.push("{")?;
                push_items(text, entries.borrow().iter(), |text, (k, v)| {
                    Value::from(k.clone()).render(text, true, depth + 1)?;
                    text.push(": ")?;
                    v.render(text, true, depth + 1)
                })?;
                text.push("}")
            }
            Value::Set(items) => {
                let items = items.borrow();
                if items.is_empty() {
                    return text.push("set()");
                }
                text.push("{")?;
                push_items(text, items.iter(), |text, k| {
                    Value::from(k.clone()).render(text, true, depth + 1)
                })?;
                text.push("}")
            }
            Value::Range(r) if r.step == 1 => {
                text.push(&format!("range({}, {})", r.start, r.stop))
            }
            Value::Range(r) => text.push(&format!("range({}, {}, {})", r.start, r.stop, r.step)),
            Value::Function(def) => text.push(&format!("<function {}>", def.name.name)),
            Value::Builtin(b) => text.push(&format!("<built-in function {}>", b.name())),
            Value::Action(a) => text.push(&format!("<built-in function {}>", a.name())),
        }
    }
}

/// The `str()` form, cut short like [`Value::repr`].
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview(false))
    }
}
