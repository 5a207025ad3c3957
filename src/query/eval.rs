//! Tree-walking evaluator.
//!
//! Evaluation never fails: unknown names are null, incomparable orderings
//! are false, and out-of-range subscripts are null.

use super::ast::{CmpOp, Expr, Function, Index};
use super::context::PredicateContext;
use crate::interchange::{ModelAccess, Value};
use std::cmp::Ordering;

pub fn evaluate<M: ModelAccess + ?Sized>(expr: &Expr, ctx: &PredicateContext<'_, M>) -> Value {
    match expr {
        Expr::Literal(value) => value.clone(),
        Expr::Name(name) => ctx.lookup(name),
        Expr::List(items) | Expr::Tuple(items) => {
            Value::List(items.iter().map(|e| evaluate(e, ctx)).collect())
        }
        Expr::Set(items) => {
            let mut out: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                let value = evaluate(item, ctx);
                if !out.iter().any(|v| v.loose_eq(&value)) {
                    out.push(value);
                }
            }
            Value::List(out)
        }
        Expr::Map(entries) => {
            let mut out: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let key = evaluate(k, ctx);
                let value = evaluate(v, ctx);
                match out.iter_mut().find(|(existing, _)| existing.loose_eq(&key)) {
                    Some(slot) => slot.1 = value,
                    None => out.push((key, value)),
                }
            }
            Value::Map(out)
        }
        Expr::Not(operand) => Value::Bool(!evaluate(operand, ctx).is_truthy()),
        Expr::And(operands) => {
            let mut last = Value::Bool(true);
            for operand in operands {
                last = evaluate(operand, ctx);
                if !last.is_truthy() {
                    break;
                }
            }
            last
        }
        Expr::Or(operands) => {
            let mut last = Value::Bool(false);
            for operand in operands {
                last = evaluate(operand, ctx);
                if last.is_truthy() {
                    break;
                }
            }
            last
        }
        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, ctx);
            for (op, right) in rest {
                let right = evaluate(right, ctx);
                if !compare(*op, &left, &right) {
                    return Value::Bool(false);
                }
                left = right;
            }
            Value::Bool(true)
        }
        Expr::Subscript { target, index } => {
            let target = evaluate(target, ctx);
            match index.as_ref() {
                Index::Item(item) => subscript(&target, &evaluate(item, ctx)),
                Index::Slice { start, stop, step } => {
                    let bound = |e: &Option<Expr>| e.as_ref().map(|e| evaluate(e, ctx));
                    slice(&target, bound(start), bound(stop), bound(step))
                }
            }
        }
        Expr::Call { function, argument } => {
            let argument = evaluate(argument, ctx);
            let Some(name) = argument.as_str() else {
                return Value::Bool(false);
            };
            Value::Bool(match function {
                Function::IsClass => ctx.is_class(name),
                Function::IsKindOf => ctx.is_kind_of(name),
            })
        }
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> bool {
    match op {
        CmpOp::Eq => left.loose_eq(right),
        CmpOp::NotEq => !left.loose_eq(right),
        CmpOp::Lt => left.compare(right) == Some(Ordering::Less),
        CmpOp::LtEq => matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => left.compare(right) == Some(Ordering::Greater),
        CmpOp::GtEq => matches!(left.compare(right), Some(Ordering::Greater | Ordering::Equal)),
        CmpOp::In => right.contains(left),
        CmpOp::NotIn => !right.contains(left),
    }
}

/// Sequence index; negative counts from the end.
fn resolve_index(len: usize, index: &Value) -> Option<usize> {
    let Value::Int(i) = index else {
        return None;
    };
    let i = if *i < 0 { *i + len as i64 } else { *i };
    (0..len as i64).contains(&i).then_some(i as usize)
}

fn subscript(target: &Value, index: &Value) -> Value {
    match target {
        Value::List(items) => resolve_index(items.len(), index)
            .map(|i| items[i].clone())
            .unwrap_or(Value::Null),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            resolve_index(chars.len(), index)
                .map(|i| Value::String(chars[i].to_string()))
                .unwrap_or(Value::Null)
        }
        Value::Map(entries) => entries
            .iter()
            .find(|(k, _)| k.loose_eq(index))
            .map(|(_, v)| v.clone())
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn slice_bound(value: Option<Value>) -> Result<Option<i64>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Int(i)) => Ok(Some(i)),
        Some(_) => Err(()),
    }
}

/// Positions selected by `[start:stop:step]` over a sequence of `len`.
fn slice_positions(len: usize, start: Option<i64>, stop: Option<i64>, step: i64) -> Vec<usize> {
    let len = len as i64;
    let mut out = Vec::new();
    if step > 0 {
        let clamp = |v: i64| if v < 0 { (v + len).max(0) } else { v.min(len) };
        let mut i = start.map(clamp).unwrap_or(0);
        let end = stop.map(clamp).unwrap_or(len);
        while i < end {
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let clamp = |v: i64| if v < 0 { (v + len).max(-1) } else { v.min(len - 1) };
        let mut i = start.map(clamp).unwrap_or(len - 1);
        let end = stop.map(clamp).unwrap_or(-1);
        while i > end {
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    out
}

fn slice(target: &Value, start: Option<Value>, stop: Option<Value>, step: Option<Value>) -> Value {
    let (Ok(start), Ok(stop), Ok(step)) = (slice_bound(start), slice_bound(stop), slice_bound(step))
    else {
        return Value::Null;
    };
    let step = step.unwrap_or(1);
    if step == 0 {
        return Value::Null;
    }
    match target {
        Value::List(items) => Value::List(
            slice_positions(items.len(), start, stop, step)
                .into_iter()
                .map(|i| items[i].clone())
                .collect(),
        ),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Value::String(
                slice_positions(chars.len(), start, stop, step)
                    .into_iter()
                    .map(|i| chars[i])
                    .collect(),
            )
        }
        _ => Value::Null,
    }
}
