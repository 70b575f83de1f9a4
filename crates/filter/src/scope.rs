//! Predicate tree evaluated against rows in memory.
//!
//! A [`Scope`] is either a single-column comparison leaf or a group of
//! nested scopes joined by `AND`/`OR` combinators. Evaluation folds the
//! combinators strictly left to right; nested groups are the only form of
//! grouping. This mirrors the SQL text the builder emits token for token.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use vitrine_core::pattern_match::regex;
use vitrine_core::{Row, Value};

/// Single-column comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Like,
    NotLike,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
}

impl Operator {
    /// The SQL spelling of this operator.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }
}

/// How two adjacent children of a group are joined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

/// Right-hand side of a comparison: one value, or a list for IN/NOT IN.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    One(Value),
    Many(Vec<Value>),
}

/// A single-column comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    column: String,
    op: Operator,
    operand: Operand,
}

impl Leaf {
    pub fn new(column: impl Into<String>, op: Operator, operand: Operand) -> Self {
        Self {
            column: column.into(),
            op,
            operand,
        }
    }

    /// Returns the referenced column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the operator.
    pub fn op(&self) -> Operator {
        self.op
    }

    /// Returns the operand.
    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Evaluates this comparison against a row.
    ///
    /// A leaf whose column is absent from the row returns
    /// `missing_columns_affected`; the caller decides whether unknown row
    /// shapes count as affected.
    pub fn matches(&self, row: &Row, missing_columns_affected: bool) -> bool {
        let value = match row.get(&self.column) {
            Some(v) => v,
            None => return missing_columns_affected,
        };

        match (&self.op, &self.operand) {
            (Operator::Eq, Operand::One(operand)) => value.loose_eq(operand),
            (Operator::Ne, Operand::One(operand)) => !value.loose_eq(operand),
            (Operator::Lt, Operand::One(operand)) => {
                value.compare(operand) == Some(Ordering::Less)
            }
            (Operator::Lte, Operand::One(operand)) => matches!(
                value.compare(operand),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            (Operator::Gt, Operand::One(operand)) => {
                value.compare(operand) == Some(Ordering::Greater)
            }
            (Operator::Gte, Operand::One(operand)) => matches!(
                value.compare(operand),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            (Operator::Like, Operand::One(operand)) => {
                like_matches(value, operand)
            }
            (Operator::NotLike, Operand::One(operand)) => {
                !like_matches(value, operand)
            }
            (Operator::In, Operand::Many(list)) => {
                list.iter().any(|v| value.loose_eq(v))
            }
            (Operator::NotIn, Operand::Many(list)) => {
                !list.iter().any(|v| value.loose_eq(v))
            }
            // A list operand only arises for IN/NOT IN; anything else is
            // unreachable through the builder.
            _ => false,
        }
    }
}

/// Translates a SQL LIKE pattern into the regex dialect used for in-memory
/// evaluation: `%` → `.*?`, `_` → `.{1}`. The resulting regex is run
/// unanchored, which is a best-effort approximation of LIKE, not a
/// guarantee of parity with the SQL engine.
pub(crate) fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    for ch in pattern.chars() {
        match ch {
            '%' => out.push_str(".*?"),
            '_' => out.push_str(".{1}"),
            other => out.push(other),
        }
    }
    out
}

fn like_matches(value: &Value, operand: &Value) -> bool {
    let pattern = like_to_regex(&operand.to_string());
    regex(&value.to_string(), &pattern)
}

/// A group of scopes joined by a combinator list of length
/// `children.len() - 1`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Group {
    children: Vec<Scope>,
    combinators: Vec<Combinator>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_child(&mut self, child: Scope) {
        self.children.push(child);
    }

    pub(crate) fn push_combinator(&mut self, combinator: Combinator) {
        self.combinators.push(combinator);
    }

    /// Returns true if the group holds no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Evaluates the group with a strict left-to-right fold, with no
    /// AND-over-OR precedence. An empty group matches everything.
    pub fn matches(&self, row: &Row, missing_columns_affected: bool) -> bool {
        let mut children = self.children.iter();
        let first = match children.next() {
            Some(child) => child,
            None => return true,
        };
        debug_assert_eq!(self.combinators.len(), self.children.len() - 1);

        let mut result = first.matches(row, missing_columns_affected);
        for (child, combinator) in children.zip(self.combinators.iter()) {
            match combinator {
                Combinator::And => {
                    result = result && child.matches(row, missing_columns_affected)
                }
                Combinator::Or => {
                    result = result || child.matches(row, missing_columns_affected)
                }
            }
        }
        result
    }
}

/// The predicate tree: a comparison leaf or a nested group.
#[derive(Clone, Debug, PartialEq)]
pub enum Scope {
    Leaf(Leaf),
    Group(Group),
}

impl Scope {
    /// An empty scope, which matches every row.
    pub fn empty() -> Self {
        Scope::Group(Group::new())
    }

    /// Evaluates the scope against a row.
    pub fn matches(&self, row: &Row, missing_columns_affected: bool) -> bool {
        match self {
            Scope::Leaf(leaf) => leaf.matches(row, missing_columns_affected),
            Scope::Group(group) => group.matches(row, missing_columns_affected),
        }
    }
}
