//! Mutation notifications.

use alloc::vec::Vec;
use vitrine_core::{Row, TableRef};

/// The kind of mutation a notification describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// Schema change or bulk untracked mutation. Affected rows are
    /// unknown, so every view on the table reloads.
    Alter,
}

/// A buffered mutation notification.
///
/// Exists only inside the lifetime of one open transaction: enqueued while
/// the transaction runs, dispatched after COMMIT, discarded wholesale on
/// ROLLBACK.
#[derive(Clone, Debug)]
pub struct PendingNotification {
    pub op: Operation,
    pub table: TableRef,
    /// The affected rows. `None` for Alter, where they are unknown.
    pub rows: Option<Vec<Row>>,
}

impl PendingNotification {
    pub fn new(op: Operation, table: TableRef, rows: Option<Vec<Row>>) -> Self {
        Self { op, table, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_notification_carries_rows() {
        let n = PendingNotification::new(
            Operation::Create,
            TableRef::new(1, "routines"),
            Some(vec![Row::new(1)]),
        );
        assert_eq!(n.op, Operation::Create);
        assert_eq!(n.table.name(), "routines");
        assert_eq!(n.rows.as_ref().map(|rows| rows.len()), Some(1));

        let n = PendingNotification::new(Operation::Alter, TableRef::new(1, "routines"), None);
        assert!(n.rows.is_none());
    }
}
