//! Error types for the Vitrine data-access layer.

use crate::row::RowId;
use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

/// Result type alias for Vitrine operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for data-access operations.
#[derive(Debug)]
pub enum Error {
    /// Table not found in the row store.
    TableNotFound {
        name: String,
    },
    /// Row not found in a table.
    RowNotFound {
        table: String,
        id: RowId,
    },
    /// A SQL statement the engine could not interpret.
    InvalidStatement {
        message: String,
        position: usize,
    },
    /// Invalid operation (e.g. reusing a completed transaction).
    InvalidOperation {
        message: String,
    },
    /// Operation attempted without an open connection.
    NotConnected,
    /// A failure wrapped with the operation that caused it, e.g.
    /// "Failed to create row: …". Engine failures are never retried by this
    /// layer; retry policy belongs to the caller.
    Operation {
        context: String,
        source: Box<Error>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::RowNotFound { table, id } => {
                write!(f, "Row {} not found in table {}", id, table)
            }
            Error::InvalidStatement { message, position } => {
                write!(f, "Invalid statement at {}: {}", position, message)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
            Error::NotConnected => {
                write!(f, "Operation failed: no row store connection")
            }
            Error::Operation { context, source } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl Error {
    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a row not found error.
    pub fn row_not_found(table: impl Into<String>, id: RowId) -> Self {
        Error::RowNotFound {
            table: table.into(),
            id,
        }
    }

    /// Creates an invalid statement error.
    pub fn invalid_statement(message: impl Into<String>, position: usize) -> Self {
        Error::InvalidStatement {
            message: message.into(),
            position,
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Wraps this error with operation context.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Operation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns true if this error (or the one it wraps) is a missing row.
    pub fn is_row_not_found(&self) -> bool {
        match self {
            Error::RowNotFound { .. } => true,
            Error::Operation { source, .. } => source.is_row_not_found(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::table_not_found("routines");
        assert!(err.to_string().contains("routines"));

        let err = Error::row_not_found("routines", 9);
        assert!(err.to_string().contains("9"));

        assert!(Error::NotConnected.to_string().contains("no row store"));
    }

    #[test]
    fn test_context_wrapping() {
        let err = Error::row_not_found("routines", 1).context("Failed to update row");
        assert_eq!(
            err.to_string(),
            "Failed to update row: Row 1 not found in table routines"
        );
        assert!(err.is_row_not_found());
    }

    #[test]
    fn test_is_row_not_found_negative() {
        assert!(!Error::NotConnected.is_row_not_found());
        assert!(!Error::table_not_found("x")
            .context("Failed to fetch rows")
            .is_row_not_found());
    }
}
