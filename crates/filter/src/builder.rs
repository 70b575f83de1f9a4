//! Fluent builder producing one immutable [`Filter`] at `build()`.
//!
//! The grammar is enforced at compile time by one builder type per
//! position:
//!
//! ```text
//! query() .where_() .column(name) .<pred>(value)
//!     [ .and() | .or() | .open_scope() | .close_scope() ]*
//!  .end_where() [.order_by(col, dir)]* [.limit(n)]* [.offset(n)]* .build()
//! ```
//!
//! Every predicate call does two things atomically: it appends the SQL
//! token (`<col> <op> <value>`) and registers the corresponding leaf in the
//! in-memory [`Scope`] tree, so the two representations cannot diverge.
//! Scope balance is the one property the types cannot enforce; `build()`
//! returns [`BuilderError::UnbalancedScope`] when it is violated.

use crate::error::BuilderError;
use crate::filter::{Filter, OrderDirection};
use crate::scope::{Combinator, Group, Leaf, Operand, Operator, Scope};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use vitrine_core::Value;

/// Starts a new filter.
pub fn query() -> FilterBuilder {
    FilterBuilder { core: Core::new() }
}

/// Shared builder state threaded through the grammar positions.
struct Core {
    tokens: Vec<String>,
    /// Group stack; index 0 is the root scope.
    groups: Vec<Group>,
    /// Raw open/close balance. Negative when a close at root occurred.
    depth: isize,
    order: Vec<(String, OrderDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Core {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            groups: alloc::vec![Group::new()],
            depth: 0,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    fn current(&mut self) -> &mut Group {
        self.groups.last_mut().expect("group stack is never empty")
    }

    fn push_predicate(&mut self, column: &str, op: Operator, operand: Operand) {
        let token = match &operand {
            Operand::One(value) => {
                format!("{} {} {}", column, op.sql(), sql_literal(value))
            }
            Operand::Many(values) => {
                let mut list = String::new();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        list.push_str(", ");
                    }
                    list.push_str(&sql_literal(value));
                }
                format!("{} {} ({})", column, op.sql(), list)
            }
        };
        self.tokens.push(token);
        self.current().push_child(Scope::Leaf(Leaf::new(column, op, operand)));
    }

    fn push_combinator(&mut self, combinator: Combinator) {
        self.tokens.push(
            match combinator {
                Combinator::And => "AND",
                Combinator::Or => "OR",
            }
            .to_string(),
        );
        self.current().push_combinator(combinator);
    }

    fn open_scope(&mut self) {
        self.depth += 1;
        self.tokens.push("(".to_string());
        self.groups.push(Group::new());
    }

    fn close_scope(&mut self) {
        self.depth -= 1;
        self.tokens.push(")".to_string());
        if self.groups.len() > 1 {
            let finished = self.groups.pop().expect("checked length above");
            self.current().push_child(Scope::Group(finished));
        }
    }

    fn push_order(&mut self, column: &str, direction: OrderDirection) {
        // The first insertion position for a column is retained; a later
        // call only overwrites the direction.
        if let Some(entry) = self.order.iter_mut().find(|(c, _)| c == column) {
            entry.1 = direction;
        } else {
            self.order.push((column.to_string(), direction));
        }
    }

    fn build(mut self) -> Result<Filter, BuilderError> {
        // A close at the root followed by a reopen can balance the raw
        // depth while leaving groups on the stack; both checks are needed.
        if self.depth != 0 || self.groups.len() != 1 {
            let depth = if self.depth != 0 {
                self.depth
            } else {
                self.groups.len() as isize - 1
            };
            return Err(BuilderError::UnbalancedScope { depth });
        }

        let root = self.groups.pop().expect("balanced stack has one root");
        let where_sql = if self.tokens.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.tokens.join(" "))
        };

        let mut sql = where_sql.clone();
        if !self.order.is_empty() {
            let entries: Vec<String> = self
                .order
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction.sql()))
                .collect();
            push_segment(&mut sql, &format!("ORDER BY {}", entries.join(", ")));
        }
        if let Some(limit) = self.limit {
            push_segment(&mut sql, &format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            push_segment(&mut sql, &format!("OFFSET {}", offset));
        }

        Ok(Filter::new(
            sql,
            where_sql,
            Scope::Group(root),
            self.order,
            self.limit,
            self.offset,
        ))
    }
}

fn push_segment(sql: &mut String, segment: &str) {
    if !sql.is_empty() {
        sql.push(' ');
    }
    sql.push_str(segment);
}

/// Formats an operand for SQL text: strings single-quoted, booleans
/// lowered to `true`/`false`. The in-memory comparison lowers them to
/// 1/0 instead, matching how the store persists booleans.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s),
    }
}

/// Entry position: start the where clause, or go straight to ordering and
/// paging for a filter that matches everything.
pub struct FilterBuilder {
    core: Core,
}

impl FilterBuilder {
    /// Opens the WHERE clause.
    pub fn where_(self) -> WhereColumn {
        WhereColumn { core: self.core }
    }

    /// Appends or updates an ORDER BY entry.
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Self {
        self.core.push_order(column, direction);
        self
    }

    /// Sets LIMIT; the last write wins, unclamped.
    pub fn limit(mut self, limit: u64) -> Self {
        self.core.limit = Some(limit);
        self
    }

    /// Sets OFFSET; the last write wins, unclamped.
    pub fn offset(mut self, offset: u64) -> Self {
        self.core.offset = Some(offset);
        self
    }

    /// Freezes the filter.
    pub fn build(self) -> Result<Filter, BuilderError> {
        self.core.build()
    }
}

/// Position expecting a column name or an opening scope.
pub struct WhereColumn {
    core: Core,
}

impl WhereColumn {
    /// Names the column the next predicate applies to.
    pub fn column(self, name: &str) -> WherePredicate {
        WherePredicate {
            core: self.core,
            column: name.to_string(),
        }
    }

    /// Opens a nested scope.
    pub fn open_scope(mut self) -> WhereColumn {
        self.core.open_scope();
        self
    }
}

/// Position expecting a predicate on the current column.
pub struct WherePredicate {
    core: Core,
    column: String,
}

impl WherePredicate {
    fn push(mut self, op: Operator, operand: Operand) -> WhereLink {
        self.core.push_predicate(&self.column, op, operand);
        WhereLink { core: self.core }
    }

    pub fn eq(self, value: impl Into<Value>) -> WhereLink {
        self.push(Operator::Eq, Operand::One(value.into()))
    }

    pub fn ne(self, value: impl Into<Value>) -> WhereLink {
        self.push(Operator::Ne, Operand::One(value.into()))
    }

    pub fn like(self, pattern: impl Into<String>) -> WhereLink {
        self.push(Operator::Like, Operand::One(Value::Text(pattern.into())))
    }

    pub fn not_like(self, pattern: impl Into<String>) -> WhereLink {
        self.push(Operator::NotLike, Operand::One(Value::Text(pattern.into())))
    }

    pub fn lt(self, value: impl Into<Value>) -> WhereLink {
        self.push(Operator::Lt, Operand::One(value.into()))
    }

    pub fn lte(self, value: impl Into<Value>) -> WhereLink {
        self.push(Operator::Lte, Operand::One(value.into()))
    }

    pub fn gt(self, value: impl Into<Value>) -> WhereLink {
        self.push(Operator::Gt, Operand::One(value.into()))
    }

    pub fn gte(self, value: impl Into<Value>) -> WhereLink {
        self.push(Operator::Gte, Operand::One(value.into()))
    }

    pub fn is_in<I, V>(self, values: I) -> WhereLink
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.push(Operator::In, Operand::Many(values))
    }

    pub fn not_in<I, V>(self, values: I) -> WhereLink
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.push(Operator::NotIn, Operand::Many(values))
    }
}

/// Position after a predicate: chain on, close a scope, or finish the
/// where clause.
pub struct WhereLink {
    core: Core,
}

impl WhereLink {
    pub fn and(mut self) -> WhereColumn {
        self.core.push_combinator(Combinator::And);
        WhereColumn { core: self.core }
    }

    pub fn or(mut self) -> WhereColumn {
        self.core.push_combinator(Combinator::Or);
        WhereColumn { core: self.core }
    }

    pub fn close_scope(mut self) -> WhereLink {
        self.core.close_scope();
        self
    }

    /// Ends the WHERE clause.
    pub fn end_where(self) -> FilterTail {
        FilterTail { core: self.core }
    }
}

/// Trailing position: ordering, paging, build.
pub struct FilterTail {
    core: Core,
}

impl FilterTail {
    /// Appends an ORDER BY entry, or overwrites the direction of an
    /// existing one. The first insertion position for a column is
    /// retained even when its direction changes later.
    pub fn order_by(mut self, column: &str, direction: OrderDirection) -> Self {
        self.core.push_order(column, direction);
        self
    }

    /// Sets LIMIT; the last write wins, unclamped.
    pub fn limit(mut self, limit: u64) -> Self {
        self.core.limit = Some(limit);
        self
    }

    /// Sets OFFSET; the last write wins, unclamped.
    pub fn offset(mut self, offset: u64) -> Self {
        self.core.offset = Some(offset);
        self
    }

    /// Freezes the filter, verifying scope balance.
    pub fn build(self) -> Result<Filter, BuilderError> {
        self.core.build()
    }
}
