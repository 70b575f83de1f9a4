//! The row store engine contract.

use alloc::string::String;
use alloc::vec::Vec;
use vitrine_core::{Result, Row, RowId, Value};

/// Connection configuration handed to [`RowStoreEngine::open`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    database: String,
}

impl EngineConfig {
    /// Creates a configuration pointing at the named database
    /// (a file path, DSN, or in-memory store name; engine-defined).
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    /// Returns the database name.
    #[inline]
    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Result of a mutating statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunResult {
    /// Rowid assigned to the most recently inserted row.
    pub last_insert_row_id: RowId,
    /// Number of rows the statement affected.
    pub rows_affected: u64,
}

/// The contract every row store engine implements.
///
/// A `Conn` is an opaque connection handle. All methods block until the
/// engine answers; these calls are the only suspension points of the layer
/// above. At most one logical writer is assumed at a time; if the engine
/// allows truly concurrent transactions, callers must serialize them
/// externally or the notification buffering above this contract becomes
/// incorrect.
pub trait RowStoreEngine {
    type Conn;

    /// Opens a connection.
    fn open(&self, config: &EngineConfig) -> Result<Self::Conn>;

    /// Closes a connection. An open transaction on the connection is
    /// rolled back.
    fn close(&self, conn: Self::Conn) -> Result<()>;

    /// Executes a statement that produces no rows.
    fn exec(&self, conn: &Self::Conn, sql: &str) -> Result<()>;

    /// Executes a mutation with positional `?` binds.
    fn run(&self, conn: &Self::Conn, sql: &str, binds: &[Value]) -> Result<RunResult>;

    /// Executes a query and returns all matching rows.
    fn all(&self, conn: &Self::Conn, sql: &str, binds: &[Value]) -> Result<Vec<Row>>;

    /// Executes a query and returns the first matching row, or an error if
    /// there is none.
    fn get(&self, conn: &Self::Conn, sql: &str, binds: &[Value]) -> Result<Row>;
}
