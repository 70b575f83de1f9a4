//! Vitrine Core - Core types for the Vitrine reactive data-access layer.
//!
//! This crate provides the foundational types shared by every layer:
//!
//! - `Value`: Runtime values stored in row fields (Null, Bool, Int, Float, Text)
//! - `Row`: A record with a unique integer id plus arbitrary named fields
//! - `TableRef`: Identity of a table (numeric id + SQL name)
//! - `Error`: Error types for data-access operations
//! - `pattern_match`: LIKE and regex matching used by the in-memory
//!   predicate evaluator and the reference engine
//!
//! # Example
//!
//! ```rust
//! use vitrine_core::{Row, Value};
//!
//! let row = Row::new(1)
//!     .with("name", Value::Text("Alice".into()))
//!     .with("age", Value::Int(32));
//!
//! assert_eq!(row.id(), 1);
//! assert_eq!(row.get("age"), Some(&Value::Int(32)));
//! ```

#![no_std]

extern crate alloc;

mod error;
pub mod pattern_match;
mod row;
mod types;
mod value;

pub use error::{Error, Result};
pub use row::{Row, RowId, UNASSIGNED_ROW_ID};
pub use types::{TableId, TableRef};
pub use value::Value;
