//! Vitrine Database - The data-access facade.
//!
//! [`Database`] sits between a row store engine and the reactive view
//! layer. It owns the shared caches (one [`vitrine_reactive::RowView`] per
//! row, a registry of [`vitrine_reactive::TableView`]s per table), performs
//! all SQL generation, and coordinates mutation notifications:
//!
//! - Mutations performed outside a transaction dispatch to the affected
//!   views immediately.
//! - Mutations performed with a transaction connection enqueue
//!   [`PendingNotification`]s that are dispatched only after COMMIT, and
//!   discarded wholesale on ROLLBACK. Observers can never see the effects
//!   of a transaction that did not commit.
//!
//! The dispatch rules per operation:
//!
//! - Create/Delete: reload every table view on the mutated table whose
//!   filter would be affected by the changed rows. The predicate test only
//!   skips irrelevant views cheaply; the reload is the correctness-bearing
//!   step, because pagination windows and counts may shift.
//! - Update: re-fetch each affected row individually and refresh the
//!   cached row view in place. An update never inserts a row into a view
//!   it was not already part of.
//! - Alter: reload every table view on the table; affected rows are
//!   unknown.

#![no_std]

extern crate alloc;

mod database;
mod notification;
mod sql;

pub use database::Database;
pub use notification::{Operation, PendingNotification};

// The commonly used types from the layer below, so most callers need only
// this crate.
pub use vitrine_core::{Error, Result, Row, RowId, TableId, TableRef, Value};
pub use vitrine_filter::{query, BuilderError, Filter, OrderDirection};
pub use vitrine_reactive::{RowView, SubscriptionId, TableView, ViewId};
pub use vitrine_storage::{EngineConfig, MemoryEngine, RowStoreEngine, RunResult};
