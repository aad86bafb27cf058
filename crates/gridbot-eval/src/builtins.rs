//! Builtin functions and collection methods.
//!
//! Nothing here suspends, so every builtin that builds or walks a
//! collection checks the size limit and pays for its work out of the step
//! [`Budget`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::num::IntErrorKind;

use crate::budget::Budget;
use crate::error::{EvalResult, FaultKind, RuntimeFault};
use crate::value::{compare_values, values_equal, Key, Range, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Range,
    Len,
    Abs,
    Min,
    Max,
    Int,
    Str,
    Bool,
    Sum,
    Sorted,
    List,
    Dict,
    Set,
}

impl Builtin {
    pub const ALL: [Builtin; 13] = [
        Builtin::Range,
        Builtin::Len,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Int,
        Builtin::Str,
        Builtin::Bool,
        Builtin::Sum,
        Builtin::Sorted,
        Builtin::List,
        Builtin::Dict,
        Builtin::Set,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Range => "range",
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Int => "int",
            Builtin::Str => "str",
            Builtin::Bool => "bool",
            Builtin::Sum => "sum",
            Builtin::Sorted => "sorted",
            Builtin::List => "list",
            Builtin::Dict => "dict",
            Builtin::Set => "set",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn call(self, args: Vec<Value>, budget: &Budget) -> EvalResult<Value> {
        let name = self.name();
        match self {
            Builtin::Range => {
                check_arity(name, &args, 1, 3)?;
                let ints = args
                    .iter()
                    .map(|a| a.expect_int("range()"))
                    .collect::<EvalResult<Vec<_>>>()?;
                let (start, stop, step) = match ints.as_slice() {
                    [stop] => (0, *stop, 1),
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => return Err(RuntimeFault::type_error("range expected 1 to 3 arguments")),
                };
                if step == 0 {
                    return Err(RuntimeFault::value_error("range() arg 3 must not be zero"));
                }
                Ok(Value::Range(Range { start, stop, step }))
            }
            Builtin::Len => {
                check_arity(name, &args, 1, 1)?;
                let len = length(&args[0])?;
                Ok(Value::Int(i64::try_from(len).map_err(|_| RuntimeFault::overflow())?))
            }
            Builtin::Abs => {
                check_arity(name, &args, 1, 1)?;
                let n = args[0].expect_int("abs()")?;
                n.checked_abs().map(Value::Int).ok_or_else(RuntimeFault::overflow)
            }
            Builtin::Min | Builtin::Max => {
                if args.is_empty() {
                    return Err(RuntimeFault::type_error(format!(
                        "{name} expected at least 1 argument, got 0"
                    )));
                }
                let items = if args.len() == 1 {
                    iterate(&args[0], budget)?
                } else {
                    args
                };
                let wanted = if self == Builtin::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut items = items.into_iter();
                let mut best = items.next().ok_or_else(|| {
                    RuntimeFault::value_error(format!("{name}() arg is an empty sequence"))
                })?;
                for item in items {
                    if compare_values(&item, &best, budget)? == wanted {
                        best = item;
                    }
                }
                Ok(best)
            }
            Builtin::Int => {
                check_arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::Int(0)),
                    Some(Value::Str(s)) => parse_int(s),
                    Some(v) => v.as_int().map(Value::Int).ok_or_else(|| {
                        RuntimeFault::type_error(format!(
                            "int() argument must be a string or a number, not '{}'",
                            v.type_name()
                        ))
                    }),
                }
            }
            Builtin::Str => {
                check_arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::str("")),
                    Some(v) => Ok(Value::str(&v.to_text(false, budget)?)),
                }
            }
            Builtin::Bool => {
                check_arity(name, &args, 0, 1)?;
                Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
            }
            Builtin::Sum => {
                check_arity(name, &args, 1, 2)?;
                let mut total = match args.get(1) {
                    Some(start) => start.expect_int("sum()")?,
                    None => 0,
                };
                for item in iterate(&args[0], budget)? {
                    let n = item.as_int().ok_or_else(|| {
                        RuntimeFault::type_error(format!(
                            "unsupported operand type(s) for +: 'int' and '{}'",
                            item.type_name()
                        ))
                    })?;
                    total = total.checked_add(n).ok_or_else(RuntimeFault::overflow)?;
                }
                Ok(Value::Int(total))
            }
            Builtin::Sorted => {
                check_arity(name, &args, 1, 1)?;
                let mut items = iterate(&args[0], budget)?;
                sort_values(&mut items, budget)?;
                Ok(Value::list(items))
            }
            Builtin::List => {
                check_arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::list(Vec::new())),
                    Some(v) => Ok(Value::list(iterate(v, budget)?)),
                }
            }
            Builtin::Dict => {
                check_arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::dict(BTreeMap::new())),
                    Some(Value::Dict(entries)) => {
                        let entries = entries.borrow();
                        budget.alloc(entries.len())?;
                        Ok(Value::dict(entries.clone()))
                    }
                    Some(v) => Err(RuntimeFault::type_error(format!(
                        "cannot convert '{}' to a dict",
                        v.type_name()
                    ))),
                }
            }
            Builtin::Set => {
                check_arity(name, &args, 0, 1)?;
                let mut items = BTreeSet::new();
                if let Some(v) = args.first() {
                    for item in iterate(v, budget)? {
                        items.insert(Key::try_from(&item)?);
                    }
                }
                Ok(Value::set(items))
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn check_arity(name: &str, args: &[Value], min: usize, max: usize) -> EvalResult<()> {
    let given = args.len();
    if (min..=max).contains(&given) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {min}")
    } else if given < min {
        format!("at least {min}")
    } else {
        format!("at most {max}")
    };
    Err(RuntimeFault::type_error(format!(
        "{name}() takes {expected} argument(s) ({given} given)"
    )))
}

/// Resolve a possibly negative index against `len`.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn parse_int(text: &str) -> EvalResult<Value> {
    match text.trim().parse::<i64>() {
        Ok(n) => Ok(Value::Int(n)),
        Err(err) if matches!(err.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
            Err(RuntimeFault::overflow())
        }
        Err(_) => Err(RuntimeFault::value_error(format!(
            "invalid literal for int() with base 10: {}",
            Value::str(text).repr()
        ))),
    }
}

pub(crate) fn length(value: &Value) -> EvalResult<usize> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Dict(entries) => Ok(entries.borrow().len()),
        Value::Set(items) => Ok(items.borrow().len()),
        Value::Range(range) => Ok(range.len()),
        other => Err(RuntimeFault::type_error(format!(
            "object of type '{}' has no len()",
            other.type_name()
        ))),
    }
}

/// The items a `for` loop or a collection builtin walks over.
///
/// Collections are copied; later changes to them do not affect the walk.
pub(crate) fn iterate(value: &Value, budget: &Budget) -> EvalResult<Vec<Value>> {
    if !matches!(value, Value::Range(_)) {
        budget.charge(length(value).map_err(|_| not_iterable(value))?)?;
    }
    match value {
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.encode_utf8(&mut [0; 4]))).collect()),
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Dict(entries) => Ok(entries.borrow().keys().cloned().map(Value::from).collect()),
        Value::Set(items) => Ok(items.borrow().iter().cloned().map(Value::from).collect()),
        Value::Range(range) => {
            budget.alloc(range.len())?;
            Ok((0..range.len()).filter_map(|i| range.get(i)).map(Value::Int).collect())
        }
        other => Err(not_iterable(other)),
    }
}

pub(crate) fn not_iterable(value: &Value) -> RuntimeFault {
    RuntimeFault::type_error(format!("'{}' object is not iterable", value.type_name()))
}

fn sort_values(items: &mut [Value], budget: &Budget) -> EvalResult<()> {
    let mut error = None;
    items.sort_by(|a, b| {
        if error.is_some() {
            return Ordering::Equal;
        }
        compare_values(a, b, budget).unwrap_or_else(|err| {
            error.get_or_insert(err);
            Ordering::Equal
        })
    });
    match error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Methods
// ══════════════════════════════════════════════════════════════════════════════

/// `object.method(args)` for the builtin collection and string types.
pub fn call_method(
    object: &Value,
    method: &str,
    args: Vec<Value>,
    budget: &Budget,
) -> EvalResult<Value> {
    let qualified = format!("{}.{method}", object.type_name());
    match (object, method) {
        // ── list ──
        (Value::List(items), "append") => {
            check_arity(&qualified, &args, 1, 1)?;
            let mut items = items.borrow_mut();
            budget.check_len(items.len() + 1)?;
            items.extend(args);
            Ok(Value::None)
        }
        (Value::List(items), "pop") => {
            check_arity(&qualified, &args, 0, 1)?;
            let index = match args.first() {
                Some(i) => i.expect_int("pop()")?,
                None => -1,
            };
            let mut items = items.borrow_mut();
            if items.is_empty() {
                return Err(RuntimeFault::index_error("pop from empty list"));
            }
            let at = normalize_index(index, items.len())
                .ok_or_else(|| RuntimeFault::index_error("pop index out of range"))?;
            Ok(items.remove(at))
        }
        (Value::List(items), "insert") => {
            check_arity(&qualified, &args, 2, 2)?;
            let index = args[0].expect_int("insert()")?;
            let mut items = items.borrow_mut();
            budget.check_len(items.len() + 1)?;
            budget.charge(items.len())?;
            let len = i64::try_from(items.len()).map_err(|_| RuntimeFault::overflow())?;
            let at = if index < 0 { (index + len).max(0) } else { index.min(len) };
            let at = usize::try_from(at).map_err(|_| RuntimeFault::overflow())?;
            items.insert(at, args[1].clone());
            Ok(Value::None)
        }
        (Value::List(items), "index") => {
            check_arity(&qualified, &args, 1, 1)?;
            let mut position = None;
            for (i, item) in items.borrow().iter().enumerate() {
                if values_equal(item, &args[0], budget)? {
                    position = Some(i);
                    break;
                }
            }
            match position {
                Some(i) => Ok(Value::Int(i64::try_from(i).map_err(|_| RuntimeFault::overflow())?)),
                None => Err(RuntimeFault::value_error(format!(
                    "{} is not in list",
                    args[0].repr()
                ))),
            }
        }
        (Value::List(items), "count") => {
            check_arity(&qualified, &args, 1, 1)?;
            let mut count = 0usize;
            for item in items.borrow().iter() {
                if values_equal(item, &args[0], budget)? {
                    count += 1;
                }
            }
            Ok(Value::Int(i64::try_from(count).map_err(|_| RuntimeFault::overflow())?))
        }

        // ── dict ──
        (Value::Dict(entries), "get") => {
            check_arity(&qualified, &args, 1, 2)?;
            let key = Key::try_from(&args[0])?;
            let found = entries.borrow().get(&key).cloned();
            Ok(found.or_else(|| args.get(1).cloned()).unwrap_or(Value::None))
        }
        (Value::Dict(entries), "keys") => {
            check_arity(&qualified, &args, 0, 0)?;
            let entries = entries.borrow();
            budget.alloc(entries.len())?;
            Ok(Value::list(entries.keys().cloned().map(Value::from).collect()))
        }
        (Value::Dict(entries), "values") => {
            check_arity(&qualified, &args, 0, 0)?;
            let entries = entries.borrow();
            budget.alloc(entries.len())?;
            Ok(Value::list(entries.values().cloned().collect()))
        }
        (Value::Dict(entries), "pop") => {
            check_arity(&qualified, &args, 1, 2)?;
            let key = Key::try_from(&args[0])?;
            let removed = entries.borrow_mut().remove(&key);
            removed
                .or_else(|| args.get(1).cloned())
                .ok_or_else(|| key_error(&key))
        }

        // ── set ──
        (Value::Set(items), "add") => {
            check_arity(&qualified, &args, 1, 1)?;
            let key = Key::try_from(&args[0])?;
            let mut items = items.borrow_mut();
            if !items.contains(&key) {
                budget.check_len(items.len() + 1)?;
                items.insert(key);
            }
            Ok(Value::None)
        }
        (Value::Set(items), "remove") => {
            check_arity(&qualified, &args, 1, 1)?;
            let key = Key::try_from(&args[0])?;
            if items.borrow_mut().remove(&key) {
                Ok(Value::None)
            } else {
                Err(key_error(&key))
            }
        }
        (Value::Set(items), "discard") => {
            check_arity(&qualified, &args, 1, 1)?;
            let key = Key::try_from(&args[0])?;
            items.borrow_mut().remove(&key);
            Ok(Value::None)
        }

        // ── str ──
        (Value::Str(s), "upper") => {
            check_arity(&qualified, &args, 0, 0)?;
            budget.alloc(s.len())?;
            Ok(Value::str(&s.to_uppercase()))
        }
        (Value::Str(s), "lower") => {
            check_arity(&qualified, &args, 0, 0)?;
            budget.alloc(s.len())?;
            Ok(Value::str(&s.to_lowercase()))
        }

        _ => Err(RuntimeFault::type_error(format!(
            "'{}' object has no method '{method}'",
            object.type_name()
        ))),
    }
}

pub(crate) fn key_error(key: &Key) -> RuntimeFault {
    RuntimeFault::new(FaultKind::KeyError, key.repr())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget() -> Budget {
        Budget::new(1000, 1_000_000)
    }

    fn equal(a: &Value, b: &Value) -> bool {
        values_equal(a, b, &budget()).expect("within budget")
    }

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn names_round_trip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
    }

    #[test]
    fn min_max_and_sum() {
        let items = ints(&[3, -1, 7]);
        let min = Builtin::Min.call(vec![items.clone()], &budget()).expect("min");
        let max = Builtin::Max.call(vec![Value::Int(2), Value::Int(9)], &budget()).expect("max");
        let sum = Builtin::Sum.call(vec![items], &budget()).expect("sum");
        assert!(equal(&min, &Value::Int(-1)));
        assert!(equal(&max, &Value::Int(9)));
        assert!(equal(&sum, &Value::Int(9)));
        let empty = Builtin::Max.call(vec![ints(&[])], &budget());
        assert!(matches!(empty, Err(f) if f.kind == FaultKind::ValueError));
    }

    #[test]
    fn int_parses_strings() {
        let n = Builtin::Int.call(vec![Value::str(" -42 ")], &budget()).expect("int");
        assert!(equal(&n, &Value::Int(-42)));
        let bad = Builtin::Int.call(vec![Value::str("4x")], &budget());
        assert!(matches!(bad, Err(f) if f.kind == FaultKind::ValueError));
    }

    #[test]
    fn range_materialising_respects_limit() {
        let big = Builtin::Range.call(vec![Value::Int(1_000_000)], &budget()).expect("range");
        let err = Builtin::List.call(vec![big], &budget()).expect_err("too large");
        assert_eq!(err.kind, FaultKind::MemoryError);
        let zero = Builtin::Range.call(vec![Value::Int(0), Value::Int(3), Value::Int(0)], &budget());
        assert!(zero.is_err());
    }

    #[test]
    fn list_methods_mutate_in_place() {
        let list = ints(&[1, 2]);
        call_method(&list, "append", vec![Value::Int(3)], &budget()).expect("append");
        call_method(&list, "insert", vec![Value::Int(0), Value::Int(0)], &budget()).expect("insert");
        let popped = call_method(&list, "pop", Vec::new(), &budget()).expect("pop");
        assert!(equal(&popped, &Value::Int(3)));
        assert_eq!(list.to_string(), "[0, 1, 2]");
        let missing = call_method(&list, "index", vec![Value::Int(9)], &budget());
        assert!(matches!(missing, Err(f) if f.kind == FaultKind::ValueError));
    }

    #[test]
    fn dict_pop_without_default_is_a_key_error() {
        let dict = Value::dict(BTreeMap::new());
        let err = call_method(&dict, "pop", vec![Value::str("k")], &budget()).expect_err("missing");
        assert_eq!(err.to_string(), "KeyError: 'k'");
        let fallback = call_method(&dict, "get", vec![Value::str("k"), Value::Int(0)], &budget());
        assert!(matches!(fallback, Ok(Value::Int(0))));
    }

    #[test]
    fn sorted_rejects_mixed_types() {
        let mixed = Value::list(vec![Value::Int(1), Value::str("a")]);
        assert!(Builtin::Sorted.call(vec![mixed], &budget()).is_err());
    }

    #[test]
    fn unknown_method_is_a_type_error() {
        let err = call_method(&Value::Int(1), "append", Vec::new(), &budget()).expect_err("no method");
        assert_eq!(err.kind, FaultKind::TypeError);
    }

    #[test]
    fn str_refuses_text_over_the_size_limit() {
        let row = Value::list(vec![Value::Int(0); 100]);
        let grid = Value::list(vec![row; 100]);
        let err = Builtin::Str.call(vec![grid], &budget()).expect_err("too long");
        assert_eq!(err.kind, FaultKind::MemoryError);
        let short = Builtin::Str.call(vec![ints(&[1, 2])], &budget()).expect("short");
        assert!(equal(&short, &Value::str("[1, 2]")));
    }

    #[test]
    fn searching_aliased_lists_is_charged() {
        let row = ints(&[0; 500]);
        let other = ints(&[0; 500]);
        let rows = Value::list(vec![row; 500]);
        let small = Budget::new(1000, 10_000);
        let err = call_method(&rows, "count", vec![other], &small).expect_err("too much");
        assert_eq!(err.kind, FaultKind::MemoryError);
        small.refill();
        let mut last_differs = vec![0; 499];
        last_differs.push(1);
        let needle = ints(&last_differs);
        let err = call_method(&rows, "index", vec![needle], &small).expect_err("too much");
        assert_eq!(err.kind, FaultKind::MemoryError);
    }

    #[test]
    fn sorting_stops_when_work_runs_out() {
        let items = Value::list((0..1000).map(|i| Value::Int(i * 7919 % 1000)).collect());
        let small = Budget::new(1000, 2000);
        let err = Builtin::Sorted.call(vec![items], &small).expect_err("too much");
        assert_eq!(err.kind, FaultKind::MemoryError);
    }
}
