//! The immutable compiled filter value.

use crate::scope::Scope;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use vitrine_core::Row;

/// Sort direction for an ORDER BY entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    /// The SQL spelling of this direction.
    pub fn sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// An immutable compiled query: SQL suffix text plus the in-memory
/// predicate used to test rows without a round trip.
///
/// Built once via [`crate::query`]; never mutated afterwards. Two filters
/// are equal when their rendered SQL is equal.
#[derive(Clone, Debug)]
pub struct Filter {
    sql: String,
    where_sql: String,
    scope: Scope,
    order: Vec<(String, OrderDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Filter {
    pub(crate) fn new(
        sql: String,
        where_sql: String,
        scope: Scope,
        order: Vec<(String, OrderDirection)>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Self {
        Self {
            sql,
            where_sql,
            scope,
            order,
            limit,
            offset,
        }
    }

    /// A filter that matches every row and renders as the empty string.
    pub fn all() -> Self {
        Self::new(
            String::new(),
            String::new(),
            Scope::empty(),
            Vec::new(),
            None,
            None,
        )
    }

    /// Whether this filter would match the given row.
    ///
    /// An empty filter matches everything. A comparison whose column is
    /// absent from the row evaluates to `missing_columns_affected`; pick
    /// the value deliberately per call site (the notifier passes `true`
    /// so rows of unknown shape count as affected).
    pub fn would_affect_row(&self, row: &Row, missing_columns_affected: bool) -> bool {
        self.scope.matches(row, missing_columns_affected)
    }

    /// Whether this filter would match **any** of the given rows.
    pub fn would_affect_rows(&self, rows: &[Row], missing_columns_affected: bool) -> bool {
        rows.iter()
            .any(|row| self.scope.matches(row, missing_columns_affected))
    }

    /// The WHERE segment alone (`"WHERE …"`), or the empty string.
    /// COUNT queries use this instead of the full suffix.
    pub fn where_clause(&self) -> &str {
        &self.where_sql
    }

    /// The in-memory predicate tree.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Ordering entries in first-insertion order.
    pub fn order(&self) -> &[(String, OrderDirection)] {
        &self.order
    }

    /// The LIMIT value, if set.
    #[inline]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// The OFFSET value, if set.
    #[inline]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

impl fmt::Display for Filter {
    /// The full SQL suffix: WHERE, ORDER BY, LIMIT, OFFSET, in that
    /// order, each segment omitted when empty. Deterministic and
    /// bit-significant for tests.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.sql == other.sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn all_matches_everything_and_renders_empty() {
        let filter = Filter::all();
        assert_eq!(filter.to_string(), "");
        assert_eq!(filter.where_clause(), "");
        assert!(filter.would_affect_row(&Row::new(1), false));
        assert_eq!(filter.limit(), None);
        assert_eq!(filter.offset(), None);
    }

    #[test]
    fn would_affect_rows_is_existential() {
        let filter = Filter::all();
        assert!(!filter.would_affect_rows(&[], false));
        assert!(filter.would_affect_rows(&[Row::new(1)], false));
    }
}
