//! The SQL dialect spoken across the engine boundary.
//!
//! The database layer emits a small, fixed statement shape; this module
//! gives the in-memory reference engine a faithful interpreter for it:
//! statement AST, recursive-descent parser, and WHERE evaluator.
//!
//! WHERE expressions follow standard SQL precedence: `AND` binds tighter
//! than `OR`. The in-memory filter evaluator above this layer instead folds
//! combinators strictly left to right, so the two can disagree on
//! unparenthesized mixed `AND`/`OR` chains. That divergence is a preserved
//! property of the system, observable in integration tests, not a bug in
//! either side.

mod eval;
mod parser;

pub use eval::{cmp_for_sort, eval_where, resolve_operand, sort_rows};
pub use parser::parse;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use vitrine_core::Value;

/// A literal or a positional `?` bind.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlOperand {
    Literal(Value),
    /// Index into the bind slice, assigned left to right.
    Placeholder(usize),
}

/// Comparison operators in WHERE predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// A WHERE expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum WhereExpr {
    Compare {
        column: String,
        op: CompareOp,
        rhs: SqlOperand,
    },
    InList {
        column: String,
        negated: bool,
        items: Vec<SqlOperand>,
    },
    Like {
        column: String,
        negated: bool,
        pattern: SqlOperand,
    },
    And(Box<WhereExpr>, Box<WhereExpr>),
    Or(Box<WhereExpr>, Box<WhereExpr>),
}

/// Right-hand side of a SET assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum SetExpr {
    Value(SqlOperand),
    /// `REPLACE(source, search, replacement)` applied to text values.
    Replace {
        source: String,
        search: SqlOperand,
        replacement: SqlOperand,
    },
}

/// One `column = expr` assignment in an UPDATE.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub expr: SetExpr,
}

/// One ORDER BY key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub descending: bool,
}

/// SELECT projection: all columns, or `COUNT(*)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    All,
    CountStar { alias: Option<String> },
}

/// A parsed statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Begin,
    Commit,
    Rollback,
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<SqlOperand>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        filter: Option<WhereExpr>,
    },
    Delete {
        table: String,
        filter: Option<WhereExpr>,
    },
    Select {
        table: String,
        projection: Projection,
        filter: Option<WhereExpr>,
        order_by: Vec<OrderKey>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    AlterAddColumn {
        table: String,
        column: String,
    },
    AlterDropColumn {
        table: String,
        column: String,
    },
}
