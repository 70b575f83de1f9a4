//! Vitrine Filter - Fluent filter compiler for the Vitrine data-access layer.
//!
//! A filter is declared once through a fluent builder and compiled into an
//! immutable [`Filter`] value holding two synchronized artifacts:
//!
//! - the SQL suffix text (`WHERE …`, `ORDER BY …`, `LIMIT`, `OFFSET`) sent
//!   to the row store, and
//! - an in-memory predicate tree ([`Scope`]) used to decide, without a
//!   round trip, whether a mutated row would affect the filtered result.
//!
//! Both artifacts are produced by the same builder call, so they cannot
//! drift apart.
//!
//! # Example
//!
//! ```rust
//! use vitrine_filter::{query, OrderDirection};
//! use vitrine_core::{Row, Value};
//!
//! let filter = query()
//!     .where_()
//!     .column("type")
//!     .eq(0i64)
//!     .end_where()
//!     .order_by("id", OrderDirection::Desc)
//!     .limit(10)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(filter.to_string(), "WHERE type = 0 ORDER BY id DESC LIMIT 10");
//! let row = Row::new(1).with("type", 0i64);
//! assert!(filter.would_affect_row(&row, false));
//! ```
//!
//! # Evaluation semantics
//!
//! `AND`/`OR` combinators inside one scope fold strictly left to right;
//! there is no AND-over-OR precedence. Explicit scopes (`open_scope` /
//! `close_scope`) are the only grouping mechanism. `LIKE` patterns are
//! approximated in memory by translating `%` to `.*?` and `_` to `.{1}`
//! and running an unanchored regex; this is a best-effort parity layer
//! whose case-sensitivity may diverge from the SQL engine's rules.

#![no_std]

extern crate alloc;

mod builder;
mod error;
mod filter;
mod scope;

pub use builder::{
    query, FilterBuilder, FilterTail, WhereColumn, WhereLink, WherePredicate,
};
pub use error::BuilderError;
pub use filter::{Filter, OrderDirection};
pub use scope::{Combinator, Group, Leaf, Operand, Operator, Scope};
