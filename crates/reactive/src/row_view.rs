//! A single cached record with reference-counted owners.

use crate::subscription::{SubscriptionId, SubscriptionManager};
use crate::table_view::ViewId;
use alloc::string::String;
use core::cell::{Cell, RefCell};
use hashbrown::{HashMap, HashSet};
use vitrine_core::{Row, RowId, TableRef};

/// A cached, identity-stable row cell.
///
/// Exactly one `RowView` exists per (table, row id); every container that
/// displays the row shares the same `Rc<RowView>`, so consumers holding a
/// reference never see a spurious identity change when other containers
/// reload. Owners register by view id; the view is disposed only when the
/// owner set becomes empty. Removal is synchronous; there is no
/// background eviction.
pub struct RowView {
    table: TableRef,
    row: RefCell<Row>,
    owners: RefCell<HashSet<ViewId>>,
    loading: RefCell<HashMap<String, u32>>,
    disposed: Cell<bool>,
    subscribers: RefCell<SubscriptionManager<Row>>,
}

impl RowView {
    /// Creates a row view around an initial snapshot.
    pub fn new(table: TableRef, row: Row) -> Self {
        Self {
            table,
            row: RefCell::new(row),
            owners: RefCell::new(HashSet::new()),
            loading: RefCell::new(HashMap::new()),
            disposed: Cell::new(false),
            subscribers: RefCell::new(SubscriptionManager::new()),
        }
    }

    /// The row id. Stable for the lifetime of the view.
    pub fn id(&self) -> RowId {
        self.row.borrow().id()
    }

    /// The owning table.
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// A snapshot of the current row value.
    pub fn row(&self) -> Row {
        self.row.borrow().clone()
    }

    /// True once the last owner has been removed.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Subscribes to value changes. The callback receives each new
    /// snapshot; it is not invoked for the current value.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Row) + 'static,
    {
        self.subscribers.borrow_mut().subscribe(callback)
    }

    /// Unsubscribes by token. Returns true if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow_mut().unsubscribe(id)
    }

    /// Replaces the cached snapshot and notifies subscribers.
    pub fn on_row_updated(&self, new_row: Row) {
        debug_assert_eq!(new_row.id(), self.id(), "row view identity is fixed");
        *self.row.borrow_mut() = new_row;
        self.notify();
    }

    fn notify(&self) {
        // Snapshot callbacks first so a subscriber may re-enter
        // subscribe/unsubscribe without hitting a borrow conflict.
        let callbacks = self.subscribers.borrow().callbacks();
        let snapshot = self.row();
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    // ---------------------------------------------------------------------
    // Ownership
    // ---------------------------------------------------------------------

    /// Number of containers currently owning this view.
    pub fn owner_count(&self) -> usize {
        self.owners.borrow().len()
    }

    /// Registers a container as an owner.
    pub fn owner_add(&self, owner_id: ViewId) {
        self.owners.borrow_mut().insert(owner_id);
    }

    /// Removes a container from the owner set. Returns true when this call
    /// emptied the set and disposed the view; the caller is responsible
    /// for evicting it from the shared cache.
    pub fn owner_remove(&self, owner_id: ViewId) -> bool {
        let mut owners = self.owners.borrow_mut();
        owners.remove(&owner_id);
        if owners.is_empty() && !self.disposed.get() {
            self.disposed.set(true);
            drop(owners);
            self.notify();
            true
        } else {
            false
        }
    }

    // ---------------------------------------------------------------------
    // Column loading flags
    // ---------------------------------------------------------------------

    /// Marks a column as loading. Calls nest; each `loading_begin` must be
    /// paired with a `loading_end`.
    pub fn loading_begin(&self, column: impl Into<String>) {
        *self.loading.borrow_mut().entry(column.into()).or_insert(0) += 1;
    }

    /// Clears one loading mark from a column.
    pub fn loading_end(&self, column: &str) {
        let mut loading = self.loading.borrow_mut();
        if let Some(count) = loading.get_mut(column) {
            *count -= 1;
            if *count == 0 {
                loading.remove(column);
            }
        }
    }

    /// True while the named column has loads in flight.
    pub fn is_column_loading(&self, column: &str) -> bool {
        self.loading.borrow().contains_key(column)
    }

    /// True while any column has loads in flight.
    pub fn is_loading(&self) -> bool {
        !self.loading.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use vitrine_core::Value;

    fn table() -> TableRef {
        TableRef::new(0, "routines")
    }

    #[test]
    fn snapshot_and_identity() {
        let view = RowView::new(table(), Row::new(3).with("name", "a"));
        assert_eq!(view.id(), 3);
        assert_eq!(view.row().get("name"), Some(&Value::Text("a".into())));
        assert_eq!(view.table().name(), "routines");
    }

    #[test]
    fn on_row_updated_notifies_subscribers() {
        let view = RowView::new(table(), Row::new(1).with("name", "a"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        view.subscribe(move |row: &Row| {
            seen_clone.borrow_mut().push(row.get("name").cloned());
        });

        view.on_row_updated(Row::new(1).with("name", "b"));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0], Some(Value::Text("b".into())));
        assert_eq!(view.row().get("name"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let view = RowView::new(table(), Row::new(1));
        let count = Rc::new(RefCell::new(0));
        let count_clone = count.clone();
        let id = view.subscribe(move |_| *count_clone.borrow_mut() += 1);

        view.on_row_updated(Row::new(1).with("x", 1i64));
        assert!(view.unsubscribe(id));
        view.on_row_updated(Row::new(1).with("x", 2i64));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn disposed_only_when_owner_set_empties() {
        let view = RowView::new(table(), Row::new(1));
        view.owner_add(10);
        view.owner_add(20);
        assert_eq!(view.owner_count(), 2);

        assert!(!view.owner_remove(10));
        assert!(!view.is_disposed());

        assert!(view.owner_remove(20));
        assert!(view.is_disposed());
        // Already disposed: removing again reports nothing new.
        assert!(!view.owner_remove(20));
    }

    #[test]
    fn owner_add_is_idempotent_per_owner() {
        let view = RowView::new(table(), Row::new(1));
        view.owner_add(10);
        view.owner_add(10);
        assert_eq!(view.owner_count(), 1);
        assert!(view.owner_remove(10));
    }

    #[test]
    fn column_loading_counters_nest() {
        let view = RowView::new(table(), Row::new(1));
        assert!(!view.is_loading());

        view.loading_begin("name");
        view.loading_begin("name");
        view.loading_begin("type");
        assert!(view.is_column_loading("name"));
        assert!(view.is_column_loading("type"));

        view.loading_end("name");
        assert!(view.is_column_loading("name"));
        view.loading_end("name");
        assert!(!view.is_column_loading("name"));

        view.loading_end("type");
        assert!(!view.is_loading());
    }
}
