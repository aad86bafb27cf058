//! Operators on runtime values: arithmetic, membership and subscripts.
//!
//! Integer arithmetic is checked; anything that would wrap is an
//! `OverflowError`. Division and modulo round toward negative infinity.

use std::collections::BTreeMap;

use gridbot_types::ast::{BinOp, UnaryOp};

use crate::budget::Budget;
use crate::builtins::{key_error, normalize_index};
use crate::error::{EvalResult, RuntimeFault};
use crate::value::{values_equal, Key, Value};

fn unsupported(op: BinOp, left: &Value, right: &Value) -> RuntimeFault {
    RuntimeFault::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

pub fn binary(op: BinOp, left: &Value, right: &Value, budget: &Budget) -> EvalResult<Value> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_binary(op, a, b).map(Value::Int);
    }
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            budget.alloc(a.len() + b.len())?;
            Ok(Value::str(&format!("{a}{b}")))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            budget.alloc(a.len() + b.len())?;
            let mut items = Vec::with_capacity(a.len() + b.len());
            items.extend(a.iter().cloned());
            items.extend(b.iter().cloned());
            Ok(Value::list(items))
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) if n.as_int().is_some() => {
            let times = repeat_count(n, s.len(), budget)?;
            Ok(Value::str(&s.repeat(times)))
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items))
            if n.as_int().is_some() =>
        {
            let items = items.borrow();
            let times = repeat_count(n, items.len(), budget)?;
            let mut out = Vec::with_capacity(items.len() * times);
            for _ in 0..times {
                out.extend(items.iter().cloned());
            }
            Ok(Value::list(out))
        }
        _ => Err(unsupported(op, left, right)),
    }
}

/// How many copies `seq * n` makes, refusing results over the size limit.
fn repeat_count(n: &Value, unit: usize, budget: &Budget) -> EvalResult<usize> {
    let n = n.as_int().unwrap_or(0);
    if n <= 0 || unit == 0 {
        return Ok(0);
    }
    let limit = budget.max_len();
    let times = usize::try_from(n).map_err(|_| RuntimeFault::too_large(limit))?;
    let total = unit.checked_mul(times).ok_or_else(|| RuntimeFault::too_large(limit))?;
    budget.alloc(total)?;
    Ok(times)
}

fn int_binary(op: BinOp, a: i64, b: i64) -> EvalResult<i64> {
    let result = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Sub => a.checked_sub(b),
        BinOp::Mul => a.checked_mul(b),
        BinOp::FloorDiv => return floor_div(a, b),
        BinOp::Mod => return floor_mod(a, b),
        BinOp::Pow => return power(a, b),
    };
    result.ok_or_else(RuntimeFault::overflow)
}

fn floor_div(a: i64, b: i64) -> EvalResult<i64> {
    if b == 0 {
        return Err(RuntimeFault::division_by_zero());
    }
    let q = a.checked_div(b).ok_or_else(RuntimeFault::overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn floor_mod(a: i64, b: i64) -> EvalResult<i64> {
    if b == 0 {
        return Err(RuntimeFault::division_by_zero());
    }
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn power(base: i64, exp: i64) -> EvalResult<i64> {
    if exp < 0 {
        return Err(RuntimeFault::value_error(
            "negative exponents are not supported for integers",
        ));
    }
    match base {
        0 | 1 => return Ok(if exp == 0 { 1 } else { base }),
        -1 => return Ok(if exp % 2 == 0 { 1 } else { -1 }),
        _ => {}
    }
    let exp = u32::try_from(exp).map_err(|_| RuntimeFault::overflow())?;
    base.checked_pow(exp).ok_or_else(RuntimeFault::overflow)
}

pub fn unary(op: UnaryOp, operand: &Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg | UnaryOp::Pos => {
            let n = operand.as_int().ok_or_else(|| {
                let symbol = if op == UnaryOp::Neg { "-" } else { "+" };
                RuntimeFault::type_error(format!(
                    "bad operand type for unary {symbol}: '{}'",
                    operand.type_name()
                ))
            })?;
            if op == UnaryOp::Neg {
                n.checked_neg().map(Value::Int).ok_or_else(RuntimeFault::overflow)
            } else {
                Ok(Value::Int(n))
            }
        }
    }
}

/// `item in container`
pub fn contains(container: &Value, item: &Value, budget: &Budget) -> EvalResult<bool> {
    match container {
        Value::List(items) => {
            for v in items.borrow().iter() {
                if values_equal(v, item, budget)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Str(s) => match item {
            Value::Str(needle) => {
                budget.charge(s.len())?;
                Ok(s.contains(&**needle))
            }
            other => Err(RuntimeFault::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::Dict(entries) => Ok(entries.borrow().contains_key(&Key::try_from(item)?)),
        Value::Set(items) => Ok(items.borrow().contains(&Key::try_from(item)?)),
        Value::Range(range) => Ok(item.as_int().is_some_and(|n| range.contains(n))),
        other => Err(RuntimeFault::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn index_of(index: &Value, len: usize, what: &str) -> EvalResult<usize> {
    let i = index.as_int().ok_or_else(|| {
        RuntimeFault::type_error(format!(
            "{what} indices must be integers, not '{}'",
            index.type_name()
        ))
    })?;
    normalize_index(i, len)
        .ok_or_else(|| RuntimeFault::index_error(format!("{what} index out of range")))
}

/// `object[index]`
pub fn subscript(object: &Value, index: &Value) -> EvalResult<Value> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let at = index_of(index, items.len(), "list")?;
            Ok(items[at].clone())
        }
        Value::Str(s) => {
            let at = index_of(index, s.chars().count(), "string")?;
            let c = s.chars().nth(at).unwrap_or_default();
            Ok(Value::str(c.encode_utf8(&mut [0; 4])))
        }
        Value::Range(range) => {
            let at = index_of(index, range.len(), "range object")?;
            range
                .get(at)
                .map(Value::Int)
                .ok_or_else(|| RuntimeFault::index_error("range object index out of range"))
        }
        Value::Dict(entries) => {
            let key = Key::try_from(index)?;
            let found = entries.borrow().get(&key).cloned();
            found.ok_or_else(|| key_error(&key))
        }
        other => Err(RuntimeFault::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `object[index] = value`
pub fn store_subscript(
    object: &Value,
    index: &Value,
    value: Value,
    budget: &Budget,
) -> EvalResult<()> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let at = index_of(index, items.len(), "list assignment")?;
            items[at] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            let key = Key::try_from(index)?;
            let mut entries = entries.borrow_mut();
            if !entries.contains_key(&key) {
                budget.check_len(entries.len() + 1)?;
            }
            entries.insert(key, value);
            Ok(())
        }
        other => Err(RuntimeFault::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Build a dict literal, later keys overwriting earlier ones.
pub fn build_dict(entries: Vec<(Value, Value)>, budget: &Budget) -> EvalResult<Value> {
    budget.alloc(entries.len())?;
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        map.insert(Key::try_from(&key)?, value);
    }
    Ok(Value::dict(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    fn budget() -> Budget {
        Budget::new(1000, 1_000_000)
    }

    fn int(op: BinOp, a: i64, b: i64) -> EvalResult<i64> {
        int_binary(op, a, b)
    }

    #[test]
    fn floor_division_rounds_down() {
        assert_eq!(int(BinOp::FloorDiv, 7, 2).ok(), Some(3));
        assert_eq!(int(BinOp::FloorDiv, -7, 2).ok(), Some(-4));
        assert_eq!(int(BinOp::Mod, -7, 2).ok(), Some(1));
        assert_eq!(int(BinOp::Mod, 7, -2).ok(), Some(-1));
        let zero = int(BinOp::Mod, 1, 0).expect_err("modulo by zero");
        assert_eq!(zero.kind, FaultKind::ZeroDivisionError);
    }

    #[test]
    fn overflow_is_a_fault() {
        let err = int(BinOp::Mul, i64::MAX, 2).expect_err("overflow");
        assert_eq!(err.kind, FaultKind::OverflowError);
        assert!(int(BinOp::FloorDiv, i64::MIN, -1).is_err());
        assert!(int(BinOp::Pow, 2, 64).is_err());
        assert_eq!(int(BinOp::Pow, -1, 1_000_001).ok(), Some(-1));
    }

    #[test]
    fn repetition_is_bounded() {
        let s = Value::str("ab");
        let ok = binary(BinOp::Mul, &s, &Value::Int(3), &budget()).expect("repeat");
        assert_eq!(ok.to_string(), "ababab");
        let err = binary(BinOp::Mul, &Value::Int(1 << 40), &s, &budget()).expect_err("too big");
        assert_eq!(err.kind, FaultKind::MemoryError);
    }

    #[test]
    fn mixed_operands_are_type_errors() {
        let err = binary(BinOp::Add, &Value::Int(1), &Value::str("a"), &budget()).expect_err("mixed");
        assert_eq!(
            err.to_string(),
            "TypeError: unsupported operand type(s) for +: 'int' and 'str'"
        );
    }

    #[test]
    fn negative_indices_wrap() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let last = subscript(&list, &Value::Int(-1)).expect("index");
        assert!(values_equal(&last, &Value::Int(2), &budget()).expect("equal"));
        let err = subscript(&list, &Value::Int(2)).expect_err("out of range");
        assert_eq!(err.kind, FaultKind::IndexError);
    }

    #[test]
    fn membership_in_aliased_lists_is_charged() {
        let row = Value::list(vec![Value::Int(0); 200]);
        let rows = Value::list(vec![row; 200]);
        let needle = Value::list(vec![Value::Int(1); 200]);
        let small = Budget::new(1000, 1000);
        assert!(contains(&rows, &needle, &small).is_ok_and(|found| !found));
        let mut zeros = vec![Value::Int(0); 199];
        zeros.push(Value::Int(1));
        let err = contains(&rows, &Value::list(zeros), &small).expect_err("too much");
        assert_eq!(err.kind, FaultKind::MemoryError);
    }
}
