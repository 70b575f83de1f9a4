//! Vitrine Storage - Row store engine boundary for the Vitrine layer.
//!
//! The cache and notification layers never talk SQL engines directly; they
//! consume the [`RowStoreEngine`] contract:
//!
//! - `open`/`close`: connection lifecycle
//! - `exec`: statements without results (BEGIN/COMMIT/ROLLBACK, DELETE, ALTER)
//! - `run`: mutations with positional binds, returning
//!   [`RunResult`] (last insert rowid + affected count)
//! - `all`/`get`: row-returning queries
//!
//! Engine calls are the only blocking points of the whole layer; the cache
//! itself performs no I/O. Engine failures propagate as typed errors and
//! are never retried here; retry policy belongs to the caller.
//!
//! [`MemoryEngine`] is the reference implementation: a schema-less
//! in-process store that interprets exactly the SQL dialect the database
//! layer emits, with journal-backed BEGIN/COMMIT/ROLLBACK. It exists so the
//! full stack is testable end to end without an external database.

#![no_std]

extern crate alloc;

mod contract;
mod memory;
pub mod sql;

pub use contract::{EngineConfig, RowStoreEngine, RunResult};
pub use memory::{MemoryConn, MemoryEngine};
