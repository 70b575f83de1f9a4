//! An ordered, filter-backed container of row views.

use crate::row_view::RowView;
use crate::subscription::{SubscriptionId, SubscriptionManager};
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicU64, Ordering};
use hashbrown::HashMap;
use vitrine_core::{RowId, TableId, TableRef};
use vitrine_filter::Filter;

/// Unique identifier for a table view, used as the owner id on row views.
pub type ViewId = u64;

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

fn next_view_id() -> ViewId {
    NEXT_VIEW_ID.fetch_add(1, Ordering::SeqCst)
}

/// A live, identity-stable list of rows matching a filter.
///
/// The container holds its row views sorted strictly ascending by id with
/// no duplicates; the filter's ORDER BY/LIMIT/OFFSET select *which* rows
/// are loaded, presentation order is the consumer's concern. The total row
/// count is tracked separately from the loaded window so paginated callers
/// can size themselves without loading everything.
///
/// The container performs no I/O itself: the database layer drives full
/// reloads through [`TableView::apply_reload`], while
/// [`TableView::on_rows_created`] / [`TableView::on_rows_deleted`] merge
/// known id sets incrementally in O(n+m) without disturbing the identity
/// of unaffected row views.
pub struct TableView {
    view_id: ViewId,
    table: TableRef,
    filter: RefCell<Filter>,
    rows: RefCell<Vec<Rc<RowView>>>,
    index: RefCell<HashMap<RowId, Rc<RowView>>>,
    total_row_count: Cell<u64>,
    initialized: Cell<bool>,
    subscribers: RefCell<SubscriptionManager<Vec<Rc<RowView>>>>,
}

impl TableView {
    /// Creates an empty, uninitialized view. The database layer performs
    /// the initial reload.
    pub fn new(table: TableRef, filter: Filter) -> Self {
        Self {
            view_id: next_view_id(),
            table,
            filter: RefCell::new(filter),
            rows: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
            total_row_count: Cell::new(0),
            initialized: Cell::new(false),
            subscribers: RefCell::new(SubscriptionManager::new()),
        }
    }

    /// The view id (owner id on row views).
    #[inline]
    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    /// The table this view reads.
    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// The table id.
    #[inline]
    pub fn table_id(&self) -> TableId {
        self.table.id()
    }

    /// A copy of the current filter.
    pub fn filter(&self) -> Filter {
        self.filter.borrow().clone()
    }

    /// Swaps the filter. The caller (database layer) must follow up with a
    /// reload; the container does not refetch by itself.
    pub fn set_filter(&self, filter: Filter) {
        *self.filter.borrow_mut() = filter;
        self.initialized.set(false);
    }

    /// True once the first reload has been applied.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Total number of rows matching the filter in the store, decoupled
    /// from the loaded window for pagination.
    #[inline]
    pub fn total_row_count(&self) -> u64 {
        self.total_row_count.get()
    }

    /// Number of loaded row views.
    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    /// True if no row views are loaded.
    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    /// A snapshot of the loaded row views, ascending by id.
    pub fn rows_snapshot(&self) -> Vec<Rc<RowView>> {
        self.rows.borrow().clone()
    }

    /// Looks up a loaded row view by id.
    pub fn row_view_by_id(&self, id: RowId) -> Option<Rc<RowView>> {
        self.index.borrow().get(&id).cloned()
    }

    /// Looks up several loaded row views; missing ids are skipped.
    pub fn row_views_by_id(&self, ids: &[RowId]) -> Vec<Rc<RowView>> {
        let index = self.index.borrow();
        ids.iter().filter_map(|id| index.get(id).cloned()).collect()
    }

    /// Subscribes to content changes; the callback receives the new row
    /// view list after each reload or merge.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Vec<Rc<RowView>>) + 'static,
    {
        self.subscribers.borrow_mut().subscribe(callback)
    }

    /// Unsubscribes by token.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow_mut().unsubscribe(id)
    }

    fn notify(&self) {
        let callbacks = self.subscribers.borrow().callbacks();
        let snapshot = self.rows_snapshot();
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    // ---------------------------------------------------------------------
    // Full reload
    // ---------------------------------------------------------------------

    /// Replaces the content with a freshly fetched window.
    ///
    /// Row views already owned keep their identity; ones that vanished
    /// lose this view's ownership. Returns the ids of row views whose
    /// owner set emptied; the caller evicts those from the shared cache.
    pub fn apply_reload(
        &self,
        total_row_count: u64,
        mut new_views: Vec<Rc<RowView>>,
    ) -> Vec<RowId> {
        new_views.sort_by_key(|view| view.id());
        debug_assert_sorted(&new_views);

        let mut disposed = Vec::new();
        {
            let mut index = self.index.borrow_mut();
            let mut stale: HashMap<RowId, Rc<RowView>> = core::mem::take(&mut *index);
            for view in &new_views {
                view.owner_add(self.view_id);
                index.insert(view.id(), view.clone());
                stale.remove(&view.id());
            }
            // Anything left is no longer tracked by this view.
            for (id, view) in stale {
                if view.owner_remove(self.view_id) {
                    disposed.push(id);
                }
            }
        }

        *self.rows.borrow_mut() = new_views;
        self.total_row_count.set(total_row_count);
        self.initialized.set(true);
        self.notify();
        disposed
    }

    // ---------------------------------------------------------------------
    // Incremental merges
    // ---------------------------------------------------------------------

    /// Merges newly created rows into the container.
    ///
    /// Both the container and `new_views` are sorted strictly ascending by
    /// id; the merge is a single O(n+m) two-pointer pass. On id equality
    /// the incoming view replaces the entry in place. Row view identity is
    /// preserved for every id not newly introduced. Only safe on views
    /// whose filter carries no pagination window; a windowed view needs a
    /// full reload instead.
    ///
    /// Returns the ids of row views disposed by replacement (normally
    /// empty, since containers share one row view per id).
    pub fn on_rows_created(&self, new_views: &[Rc<RowView>]) -> Vec<RowId> {
        debug_assert_sorted(new_views);

        let mut disposed = Vec::new();
        let mut created = 0u64;
        {
            let mut rows = self.rows.borrow_mut();
            let mut index = self.index.borrow_mut();
            debug_assert_sorted(rows.as_slice());

            let old = core::mem::take(&mut *rows);
            let mut merged = Vec::with_capacity(old.len() + new_views.len());
            let mut i = 0;
            let mut j = 0;
            while i < old.len() && j < new_views.len() {
                let old_id = old[i].id();
                let new_id = new_views[j].id();
                if old_id < new_id {
                    merged.push(old[i].clone());
                    i += 1;
                } else if old_id > new_id {
                    let view = new_views[j].clone();
                    view.owner_add(self.view_id);
                    index.insert(new_id, view.clone());
                    merged.push(view);
                    created += 1;
                    j += 1;
                } else {
                    // Same id: the incoming view replaces the entry.
                    let view = new_views[j].clone();
                    view.owner_add(self.view_id);
                    if !Rc::ptr_eq(&old[i], &view) && old[i].owner_remove(self.view_id) {
                        disposed.push(old_id);
                    }
                    index.insert(new_id, view.clone());
                    merged.push(view);
                    i += 1;
                    j += 1;
                }
            }
            for view in &old[i..] {
                merged.push(view.clone());
            }
            for view in &new_views[j..] {
                let view = view.clone();
                view.owner_add(self.view_id);
                index.insert(view.id(), view.clone());
                merged.push(view);
                created += 1;
            }
            *rows = merged;
        }

        self.total_row_count
            .set(self.total_row_count.get() + created);
        self.notify();
        disposed
    }

    /// Drops deleted rows from the container.
    ///
    /// `deleted_ids` is sorted strictly ascending; same O(n+m) two-pointer
    /// shape as [`TableView::on_rows_created`]. Returns the ids of row
    /// views whose owner set emptied.
    pub fn on_rows_deleted(&self, deleted_ids: &[RowId]) -> Vec<RowId> {
        debug_assert!(
            deleted_ids.windows(2).all(|w| w[0] < w[1]),
            "deleted ids must be sorted strictly ascending"
        );

        let mut disposed = Vec::new();
        let mut removed = 0u64;
        {
            let mut rows = self.rows.borrow_mut();
            let mut index = self.index.borrow_mut();
            debug_assert_sorted(rows.as_slice());

            let old = core::mem::take(&mut *rows);
            let mut kept = Vec::with_capacity(old.len());
            let mut j = 0;
            for view in old {
                let id = view.id();
                while j < deleted_ids.len() && deleted_ids[j] < id {
                    j += 1;
                }
                if j < deleted_ids.len() && deleted_ids[j] == id {
                    index.remove(&id);
                    if view.owner_remove(self.view_id) {
                        disposed.push(id);
                    }
                    removed += 1;
                } else {
                    kept.push(view);
                }
            }
            *rows = kept;
        }

        self.total_row_count
            .set(self.total_row_count.get().saturating_sub(removed));
        self.notify();
        disposed
    }

    // ---------------------------------------------------------------------
    // Teardown
    // ---------------------------------------------------------------------

    /// Releases every row view (teardown or disconnect). Returns the ids
    /// of row views whose owner set emptied.
    pub fn clear(&self) -> Vec<RowId> {
        let mut disposed = Vec::new();
        {
            let mut rows = self.rows.borrow_mut();
            let mut index = self.index.borrow_mut();
            for view in rows.drain(..) {
                if view.owner_remove(self.view_id) {
                    disposed.push(view.id());
                }
            }
            index.clear();
        }
        self.total_row_count.set(0);
        self.initialized.set(false);
        self.notify();
        disposed
    }
}

fn debug_assert_sorted(views: &[Rc<RowView>]) {
    debug_assert!(
        views.windows(2).all(|w| w[0].id() < w[1].id()),
        "row views must be sorted strictly ascending by id"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use vitrine_core::Row;
    use vitrine_filter::Filter;

    fn table() -> TableRef {
        TableRef::new(0, "routines")
    }

    fn view_of(ids: &[RowId]) -> (TableView, Vec<Rc<RowView>>) {
        let view = TableView::new(table(), Filter::all());
        let rows: Vec<Rc<RowView>> = ids
            .iter()
            .map(|&id| Rc::new(RowView::new(table(), Row::new(id))))
            .collect();
        view.apply_reload(ids.len() as u64, rows.clone());
        (view, rows)
    }

    fn ids_of(view: &TableView) -> Vec<RowId> {
        view.rows_snapshot().iter().map(|v| v.id()).collect()
    }

    #[test]
    fn reload_initializes_and_owns() {
        let (view, rows) = view_of(&[1, 3, 5]);
        assert!(view.is_initialized());
        assert_eq!(view.total_row_count(), 3);
        assert_eq!(ids_of(&view), [1, 3, 5]);
        for row in &rows {
            assert_eq!(row.owner_count(), 1);
        }
    }

    #[test]
    fn reload_releases_vanished_rows() {
        let (view, rows) = view_of(&[1, 3, 5]);
        let kept = rows[1].clone();
        let disposed = view.apply_reload(1, alloc::vec![kept.clone()]);

        let mut disposed_sorted = disposed;
        disposed_sorted.sort_unstable();
        assert_eq!(disposed_sorted, [1, 5]);
        assert!(rows[0].is_disposed());
        assert!(!kept.is_disposed());
        assert_eq!(ids_of(&view), [3]);
        assert_eq!(view.total_row_count(), 1);
    }

    #[test]
    fn merge_created_preserves_identity() {
        let (view, originals) = view_of(&[1, 3, 5]);
        let new_rows: Vec<Rc<RowView>> = [2, 4]
            .iter()
            .map(|&id| Rc::new(RowView::new(table(), Row::new(id))))
            .collect();

        let disposed = view.on_rows_created(&new_rows);
        assert!(disposed.is_empty());
        assert_eq!(ids_of(&view), [1, 2, 3, 4, 5]);
        assert_eq!(view.total_row_count(), 5);

        // Identity for 1, 3, 5 is untouched.
        let snapshot = view.rows_snapshot();
        assert!(Rc::ptr_eq(&snapshot[0], &originals[0]));
        assert!(Rc::ptr_eq(&snapshot[2], &originals[1]));
        assert!(Rc::ptr_eq(&snapshot[4], &originals[2]));
    }

    #[test]
    fn merge_created_appends_tail() {
        let (view, _) = view_of(&[1, 2]);
        let new_rows: Vec<Rc<RowView>> = [5, 9]
            .iter()
            .map(|&id| Rc::new(RowView::new(table(), Row::new(id))))
            .collect();
        view.on_rows_created(&new_rows);
        assert_eq!(ids_of(&view), [1, 2, 5, 9]);
    }

    #[test]
    fn merge_created_equal_id_replaces_in_place() {
        let (view, originals) = view_of(&[1, 3]);
        let replacement = Rc::new(RowView::new(table(), Row::new(3).with("name", "new")));
        let disposed = view.on_rows_created(core::slice::from_ref(&replacement));

        assert_eq!(ids_of(&view), [1, 3]);
        assert_eq!(view.total_row_count(), 2);
        let snapshot = view.rows_snapshot();
        assert!(Rc::ptr_eq(&snapshot[1], &replacement));
        // The replaced view lost this container's ownership.
        assert_eq!(disposed, [3]);
        assert!(originals[1].is_disposed());
    }

    #[test]
    fn merge_deleted_drops_and_disposes() {
        let (view, rows) = view_of(&[1, 2, 3, 4, 5]);
        let disposed = view.on_rows_deleted(&[2, 4]);
        assert_eq!(ids_of(&view), [1, 3, 5]);
        assert_eq!(view.total_row_count(), 3);
        assert_eq!(disposed, [2, 4]);
        assert!(rows[1].is_disposed());
        assert!(rows[3].is_disposed());
        assert!(!rows[0].is_disposed());
    }

    #[test]
    fn merge_deleted_ignores_unknown_ids() {
        let (view, _) = view_of(&[1, 3]);
        let disposed = view.on_rows_deleted(&[2, 9]);
        assert_eq!(ids_of(&view), [1, 3]);
        assert!(disposed.is_empty());
        assert_eq!(view.total_row_count(), 2);
    }

    #[test]
    fn shared_row_views_survive_one_container() {
        let (view_a, rows) = view_of(&[1, 2]);
        let view_b = TableView::new(table(), Filter::all());
        view_b.apply_reload(2, rows.clone());
        assert_eq!(rows[0].owner_count(), 2);

        let disposed = view_a.clear();
        assert!(disposed.is_empty());
        assert!(!rows[0].is_disposed());

        let disposed = view_b.clear();
        let mut disposed = disposed;
        disposed.sort_unstable();
        assert_eq!(disposed, [1, 2]);
        assert!(rows[0].is_disposed());
    }

    #[test]
    fn subscribers_see_each_content_change() {
        let (view, _) = view_of(&[1]);
        let lengths = Rc::new(RefCell::new(alloc::vec::Vec::new()));
        let lengths_clone = lengths.clone();
        view.subscribe(move |rows: &Vec<Rc<RowView>>| {
            lengths_clone.borrow_mut().push(rows.len());
        });

        let new_row = Rc::new(RowView::new(table(), Row::new(2)));
        view.on_rows_created(core::slice::from_ref(&new_row));
        view.on_rows_deleted(&[1, 2]);
        assert_eq!(*lengths.borrow(), [2, 0]);
    }

    #[test]
    fn set_filter_marks_uninitialized() {
        let (view, _) = view_of(&[1]);
        assert!(view.is_initialized());
        view.set_filter(Filter::all());
        assert!(!view.is_initialized());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "sorted strictly ascending")]
    fn unsorted_created_input_asserts_in_debug() {
        let (view, _) = view_of(&[1, 2]);
        let unsorted: Vec<Rc<RowView>> = [9, 5]
            .iter()
            .map(|&id| Rc::new(RowView::new(table(), Row::new(id))))
            .collect();
        view.on_rows_created(&unsorted);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "sorted strictly ascending")]
    fn unsorted_deleted_input_asserts_in_debug() {
        let (view, _) = view_of(&[1, 2]);
        view.on_rows_deleted(&[2, 1]);
    }
}
