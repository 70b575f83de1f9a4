//! WHERE evaluation and row ordering for the reference engine.
//!
//! A column missing from a row behaves like SQL NULL: every comparison on
//! it is false. This is the SQL-truth side of the parity layer; the
//! in-memory filter evaluator above carries its own missing-column policy
//! flag instead.

use super::{CompareOp, OrderKey, SqlOperand, WhereExpr};
use alloc::vec::Vec;
use core::cmp::Ordering;
use vitrine_core::pattern_match::like;
use vitrine_core::{Error, Result, Row, Value};

/// Resolves an operand against the positional binds.
pub fn resolve_operand(operand: &SqlOperand, binds: &[Value]) -> Result<Value> {
    match operand {
        SqlOperand::Literal(value) => Ok(value.clone()),
        SqlOperand::Placeholder(index) => binds.get(*index).cloned().ok_or_else(|| {
            Error::invalid_operation(alloc::format!("missing bind for placeholder {}", index + 1))
        }),
    }
}

/// Evaluates a WHERE expression against one row.
pub fn eval_where(expr: &WhereExpr, row: &Row, binds: &[Value]) -> Result<bool> {
    match expr {
        WhereExpr::Compare { column, op, rhs } => {
            let rhs = resolve_operand(rhs, binds)?;
            let value = match row.get(column) {
                Some(v) => v,
                None => return Ok(false),
            };
            let ordering = value.compare(&rhs);
            Ok(match op {
                CompareOp::Eq => ordering == Some(Ordering::Equal),
                CompareOp::Ne => {
                    matches!(ordering, Some(o) if o != Ordering::Equal)
                }
                CompareOp::Lt => ordering == Some(Ordering::Less),
                CompareOp::Lte => matches!(
                    ordering,
                    Some(Ordering::Less) | Some(Ordering::Equal)
                ),
                CompareOp::Gt => ordering == Some(Ordering::Greater),
                CompareOp::Gte => matches!(
                    ordering,
                    Some(Ordering::Greater) | Some(Ordering::Equal)
                ),
            })
        }
        WhereExpr::InList {
            column,
            negated,
            items,
        } => {
            let value = match row.get(column) {
                Some(v) => v,
                None => return Ok(false),
            };
            let mut found = false;
            for item in items {
                let item = resolve_operand(item, binds)?;
                if value.loose_eq(&item) {
                    found = true;
                    break;
                }
            }
            Ok(if *negated { !found } else { found })
        }
        WhereExpr::Like {
            column,
            negated,
            pattern,
        } => {
            let pattern = resolve_operand(pattern, binds)?;
            let value = match row.get(column) {
                Some(v) => v,
                None => return Ok(false),
            };
            // Anchored, case-sensitive LIKE. Real engines may fold case;
            // the gap is documented, not resolved.
            let matched = like(
                &alloc::string::ToString::to_string(value),
                &alloc::string::ToString::to_string(&pattern),
            );
            Ok(if *negated { !matched } else { matched })
        }
        WhereExpr::And(left, right) => {
            Ok(eval_where(left, row, binds)? && eval_where(right, row, binds)?)
        }
        WhereExpr::Or(left, right) => {
            Ok(eval_where(left, row, binds)? || eval_where(right, row, binds)?)
        }
    }
}

/// Total ordering used for ORDER BY: comparable values use the coercing
/// comparison; otherwise Null ranks lowest, numerics next, text highest.
pub fn cmp_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) | Some(Value::Int(_)) | Some(Value::Float(_)) => 1,
            Some(Value::Text(_)) => 2,
        }
    }
    match (a, b) {
        (Some(a), Some(b)) => a.compare(b).unwrap_or_else(|| rank(Some(a)).cmp(&rank(Some(b)))),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Sorts rows by the ORDER BY keys, with row id as the final tiebreaker so
/// the result is deterministic.
pub fn sort_rows(rows: &mut Vec<Row>, keys: &[OrderKey]) {
    rows.sort_by(|a, b| {
        for key in keys {
            let ordering = cmp_for_sort(a.get(&key.column), b.get(&key.column));
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id().cmp(&b.id())
    });
}
