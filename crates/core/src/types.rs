//! Table identity types.

use alloc::string::String;

/// Numeric identifier of a table, used to key the view registries.
pub type TableId = u64;

/// Identity of a table: numeric id plus the SQL name used in statements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRef {
    id: TableId,
    name: String,
}

impl TableRef {
    /// Creates a table reference.
    pub fn new(id: TableId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the table id.
    #[inline]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Returns the SQL table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
