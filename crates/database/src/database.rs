//! The database facade and transaction coordinator.

use crate::notification::{Operation, PendingNotification};
use crate::sql;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use hashbrown::HashMap;
use vitrine_core::{Error, Result, Row, RowId, TableId, TableRef, Value};
use vitrine_filter::Filter;
use vitrine_reactive::{RowView, TableView};
use vitrine_storage::{EngineConfig, RowStoreEngine};

/// Policy for filter leaves whose column is absent from a notified row.
///
/// Upstream call sites never documented the intended value; `true` is the
/// deliberate choice here. A row of unknown shape counts as affected, so
/// the worst case is a redundant reload rather than a stale view.
const MISSING_COLUMNS_AFFECTED: bool = true;

/// The reactive data-access facade.
///
/// Owns the shared row-view cache (one [`RowView`] per row id per table),
/// the table-view registry, all SQL generation, and the
/// transaction-scoped notification queue. Constructed explicitly around an
/// engine; there is no ambient global instance.
///
/// Single-threaded by design: views and caches are `Rc`/`RefCell` shared,
/// and at most one logical writer is assumed at a time. Mutations that are
/// part of a transaction must pass the transaction's connection so their
/// notifications buffer until COMMIT.
pub struct Database<E: RowStoreEngine> {
    engine: E,
    config: EngineConfig,
    conn: RefCell<Option<E::Conn>>,
    connected: Cell<bool>,
    row_views: RefCell<HashMap<TableId, HashMap<RowId, Rc<RowView>>>>,
    table_views: RefCell<HashMap<TableId, Vec<Rc<TableView>>>>,
    tx_notifications: RefCell<Vec<PendingNotification>>,
    dispatching: Cell<bool>,
    deferred: RefCell<Vec<PendingNotification>>,
}

impl<E: RowStoreEngine> Database<E> {
    /// Creates a database around an engine and its configuration. No
    /// connection is opened until [`Database::connect`].
    pub fn new(engine: E, config: EngineConfig) -> Self {
        Self {
            engine,
            config,
            conn: RefCell::new(None),
            connected: Cell::new(false),
            row_views: RefCell::new(HashMap::new()),
            table_views: RefCell::new(HashMap::new()),
            tx_notifications: RefCell::new(Vec::new()),
            dispatching: Cell::new(false),
            deferred: RefCell::new(Vec::new()),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// True while the ambient connection is open.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    // ---------------------------------------------------------------------
    // Connection lifecycle
    // ---------------------------------------------------------------------

    /// Opens the ambient connection and reloads every registered table
    /// view.
    pub fn connect(&self) -> Result<()> {
        if self.connected.get() {
            return Err(Error::invalid_operation(
                "you must disconnect before changing connections",
            ));
        }
        let conn = self.engine.open(&self.config)?;
        *self.conn.borrow_mut() = Some(conn);
        self.connected.set(true);
        self.reload_all_tables()
    }

    /// Closes the ambient connection, empties every table view, and drops
    /// the row-view cache so no stale data survives a reconnect.
    pub fn disconnect(&self) -> Result<()> {
        self.connected.set(false);
        let conn = self.conn.borrow_mut().take();
        if let Some(conn) = conn {
            self.engine.close(conn)?;
        }
        for view in self.all_views() {
            view.clear();
        }
        self.row_views.borrow_mut().clear();
        Ok(())
    }

    fn assert_connected(&self) -> Result<()> {
        if self.connected.get() {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    fn with_ambient<R>(&self, f: impl FnOnce(&E::Conn) -> Result<R>) -> Result<R> {
        let guard = self.conn.borrow();
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(Error::NotConnected),
        }
    }

    fn with_conn<R>(
        &self,
        conn: Option<&E::Conn>,
        f: impl FnOnce(&E::Conn) -> Result<R>,
    ) -> Result<R> {
        match conn {
            Some(conn) => f(conn),
            None => self.with_ambient(f),
        }
    }

    // ---------------------------------------------------------------------
    // Table views
    // ---------------------------------------------------------------------

    /// Creates a live table view for the filter, registers it for
    /// notifications, and performs the initial reload.
    pub fn fetch_table(&self, table: &TableRef, filter: Filter) -> Result<Rc<TableView>> {
        let view = Rc::new(TableView::new(table.clone(), filter));
        self.table_views
            .borrow_mut()
            .entry(table.id())
            .or_default()
            .push(view.clone());
        self.reload(&view, None)?;
        Ok(view)
    }

    /// Unregisters a table view and releases its row-view ownership.
    pub fn release_table(&self, view: &Rc<TableView>) {
        if let Some(views) = self.table_views.borrow_mut().get_mut(&view.table_id()) {
            views.retain(|v| v.view_id() != view.view_id());
        }
        let disposed = view.clear();
        self.evict(view.table_id(), &disposed);
    }

    /// Swaps a view's filter and reloads it.
    pub fn set_filter(&self, view: &Rc<TableView>, filter: Filter) -> Result<()> {
        view.set_filter(filter);
        self.reload(view, None)
    }

    /// Reloads every registered table view (reconnect path).
    pub fn reload_all_tables(&self) -> Result<()> {
        let mut first_error = None;
        for view in self.all_views() {
            if let Err(e) = self.reload(&view, None) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn all_views(&self) -> Vec<Rc<TableView>> {
        self.table_views
            .borrow()
            .values()
            .flat_map(|views| views.iter().cloned())
            .collect()
    }

    fn views_for(&self, table_id: TableId) -> Vec<Rc<TableView>> {
        self.table_views
            .borrow()
            .get(&table_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Full reload: total count plus the current window, pushed into the
    /// container with an ownership diff.
    fn reload(&self, view: &Rc<TableView>, conn: Option<&E::Conn>) -> Result<()> {
        if !self.connected.get() && conn.is_none() {
            // Skip the notification if the view already shows nothing.
            if view.is_initialized() || !view.is_empty() {
                let disposed = view.clear();
                self.evict(view.table_id(), &disposed);
            }
            return Ok(());
        }

        let table = view.table().clone();
        let filter = view.filter();
        let total = self.fetch_row_count(&table, &filter, conn)?;
        let row_views = self.fetch_rows(&table, &filter, conn)?;
        log::debug!(
            "reload view {} on {}: {} rows of {}",
            view.view_id(),
            table.name(),
            row_views.len(),
            total
        );
        let disposed = view.apply_reload(total, row_views);
        self.evict(view.table_id(), &disposed);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Row-view cache
    // ---------------------------------------------------------------------

    /// Looks up a cached row view without fetching.
    pub fn cached_row_view(&self, table_id: TableId, id: RowId) -> Option<Rc<RowView>> {
        self.row_views
            .borrow()
            .get(&table_id)
            .and_then(|views| views.get(&id).cloned())
    }

    fn evict(&self, table_id: TableId, ids: &[RowId]) {
        if ids.is_empty() {
            return;
        }
        let mut cache = self.row_views.borrow_mut();
        if let Some(views) = cache.get_mut(&table_id) {
            for id in ids {
                views.remove(id);
            }
        }
    }

    fn row_view_for(&self, table: &TableRef, row: Row) -> Rc<RowView> {
        let existing = self
            .row_views
            .borrow()
            .get(&table.id())
            .and_then(|views| views.get(&row.id()).cloned());
        match existing {
            Some(view) => {
                // Refresh the snapshot; there should never be variation.
                view.on_row_updated(row);
                view
            }
            None => {
                let view = Rc::new(RowView::new(table.clone(), row));
                self.row_views
                    .borrow_mut()
                    .entry(table.id())
                    .or_default()
                    .insert(view.id(), view.clone());
                view
            }
        }
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Total number of rows matching the filter (the window is ignored).
    pub fn fetch_row_count(
        &self,
        table: &TableRef,
        filter: &Filter,
        conn: Option<&E::Conn>,
    ) -> Result<u64> {
        let statement = sql::count_statement(table.name(), filter);
        let row = self
            .with_conn(conn, |c| self.engine.get(c, &statement, &[]))
            .map_err(|e| e.context("Failed to fetch row count"))?;
        Ok(row.get("count").and_then(Value::as_int).unwrap_or(0) as u64)
    }

    /// Uncached snapshot of the rows matching the filter.
    pub fn fetch_rows_raw(
        &self,
        table: &TableRef,
        filter: &Filter,
        conn: Option<&E::Conn>,
    ) -> Result<Vec<Row>> {
        let statement = sql::select_statement(table.name(), filter);
        self.with_conn(conn, |c| self.engine.all(c, &statement, &[]))
            .map_err(|e| e.context("Failed to fetch rows"))
    }

    /// Fetches rows as shared, cached row views. Existing views are
    /// refreshed in place so every holder sees the new values.
    pub fn fetch_rows(
        &self,
        table: &TableRef,
        filter: &Filter,
        conn: Option<&E::Conn>,
    ) -> Result<Vec<Rc<RowView>>> {
        let rows = self.fetch_rows_raw(table, filter, conn)?;
        Ok(rows
            .into_iter()
            .map(|row| self.row_view_for(table, row))
            .collect())
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Inserts a single row; see [`Database::create_rows`].
    pub fn create_row(
        &self,
        table: &TableRef,
        row: Row,
        conn: Option<&E::Conn>,
    ) -> Result<Row> {
        let mut rows = self.create_rows(table, alloc::vec![row], conn)?;
        Ok(rows.remove(0))
    }

    /// Inserts rows and returns them with their assigned ids. Rows that
    /// already carry an id keep it (undo/restore path).
    pub fn create_rows(
        &self,
        table: &TableRef,
        mut rows: Vec<Row>,
        conn: Option<&E::Conn>,
    ) -> Result<Vec<Row>> {
        self.assert_connected()?;
        if rows.is_empty() {
            return Ok(rows);
        }
        for row in rows.iter_mut() {
            let (statement, binds) = sql::insert_statement(table.name(), row);
            let result = self
                .with_conn(conn, |c| self.engine.run(c, &statement, &binds))
                .map_err(|e| e.context("Failed to create row"))?;
            if !row.is_assigned() {
                row.set_id(result.last_insert_row_id);
            }
        }
        self.notify(Operation::Create, table, Some(rows.clone()), conn.is_some())?;
        Ok(rows)
    }

    /// Updates a single complete row; see [`Database::update_rows`].
    pub fn update_row(&self, table: &TableRef, row: Row, conn: Option<&E::Conn>) -> Result<()> {
        self.update_rows(table, alloc::vec![row], conn)
    }

    /// Updates complete rows keyed by id.
    pub fn update_rows(
        &self,
        table: &TableRef,
        rows: Vec<Row>,
        conn: Option<&E::Conn>,
    ) -> Result<()> {
        self.assert_connected()?;
        if rows.is_empty() {
            return Ok(());
        }
        for row in &rows {
            let (statement, binds) = sql::update_statement(table.name(), row);
            self.with_conn(conn, |c| self.engine.run(c, &statement, &binds))
                .map_err(|e| e.context("Failed to update row"))?;
        }
        self.notify(Operation::Update, table, Some(rows), conn.is_some())
    }

    /// Deletes a single row; see [`Database::delete_rows`].
    pub fn delete_row(&self, table: &TableRef, row: Row, conn: Option<&E::Conn>) -> Result<()> {
        self.delete_rows(table, alloc::vec![row], conn)
    }

    /// Deletes rows by id.
    pub fn delete_rows(
        &self,
        table: &TableRef,
        rows: Vec<Row>,
        conn: Option<&E::Conn>,
    ) -> Result<()> {
        self.assert_connected()?;
        if rows.is_empty() {
            return Ok(());
        }
        let ids: Vec<RowId> = rows.iter().map(Row::id).collect();
        let statement = sql::delete_statement(table.name(), &ids);
        self.with_conn(conn, |c| self.engine.exec(c, &statement))
            .map_err(|e| e.context("Failed to delete rows"))?;
        self.notify(Operation::Delete, table, Some(rows), conn.is_some())
    }

    /// Adds a column to a table (dynamic schema path).
    pub fn create_column(
        &self,
        table: &TableRef,
        name: &str,
        column_type: &str,
        conn: Option<&E::Conn>,
    ) -> Result<()> {
        self.assert_connected()?;
        let statement = sql::add_column_statement(table.name(), name, column_type);
        self.with_conn(conn, |c| self.engine.exec(c, &statement))
            .map_err(|e| e.context("Failed to add column"))?;
        self.notify(Operation::Alter, table, None, conn.is_some())
    }

    /// Drops a column from a table.
    pub fn delete_column(
        &self,
        table: &TableRef,
        name: &str,
        conn: Option<&E::Conn>,
    ) -> Result<()> {
        self.assert_connected()?;
        let statement = sql::drop_column_statement(table.name(), name);
        self.with_conn(conn, |c| self.engine.exec(c, &statement))
            .map_err(|e| e.context("Failed to drop column"))?;
        self.notify(Operation::Alter, table, None, conn.is_some())
    }

    /// Replaces `search` with `replace` in a column across every row
    /// matching the filter. A bulk untracked change: dispatched as Alter.
    pub fn search_and_replace(
        &self,
        table: &TableRef,
        filter: &Filter,
        column: &str,
        search: &str,
        replace: &str,
        conn: Option<&E::Conn>,
    ) -> Result<()> {
        self.assert_connected()?;
        let statement = sql::replace_statement(table.name(), column, filter);
        let binds = [
            Value::Text(search.into()),
            Value::Text(replace.into()),
        ];
        self.with_conn(conn, |c| self.engine.run(c, &statement, &binds))
            .map_err(|e| e.context("Failed to update row"))?;
        self.notify(Operation::Alter, table, None, conn.is_some())
    }

    // ---------------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------------

    /// Runs `transaction` inside BEGIN/COMMIT on a dedicated connection.
    ///
    /// Mutations performed by the closure must pass the connection they
    /// receive; their notifications buffer until COMMIT and dispatch only
    /// then, exactly once per notification. If the closure (or COMMIT)
    /// fails, the transaction rolls back and the entire queue is discarded
    /// without dispatching anything, so observers never see effects of a
    /// transaction that did not commit.
    ///
    /// At most one transaction may be logically in flight at a time; the
    /// queue is shared, not per-connection.
    pub fn execute_transaction<F>(&self, transaction: F) -> Result<()>
    where
        F: FnOnce(&E::Conn) -> Result<()>,
    {
        self.assert_connected()?;
        let conn = self.engine.open(&self.config)?;
        if let Err(e) = self.engine.exec(&conn, "BEGIN;") {
            let _ = self.engine.close(conn);
            return Err(e);
        }

        match transaction(&conn) {
            Ok(()) => {
                if let Err(e) = self.engine.exec(&conn, "COMMIT;") {
                    let _ = self.engine.close(conn);
                    self.tx_notifications.borrow_mut().clear();
                    return Err(e);
                }
                if let Err(e) = self.engine.close(conn) {
                    // The commit went through but the queue must not leak
                    // into a later transaction's dispatch.
                    self.tx_notifications.borrow_mut().clear();
                    return Err(e);
                }
                // Detach the queue before dispatching: a transaction run
                // by a notification handler must not replay these.
                let queued: Vec<PendingNotification> =
                    core::mem::take(&mut *self.tx_notifications.borrow_mut());
                let mut first_error = None;
                for notification in queued {
                    if let Err(e) = self.dispatch(notification) {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }
            Err(e) => {
                if let Err(rollback_err) = self.engine.exec(&conn, "ROLLBACK;") {
                    log::warn!("rollback failed: {}", rollback_err);
                }
                let _ = self.engine.close(conn);
                self.tx_notifications.borrow_mut().clear();
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Notification dispatch
    // ---------------------------------------------------------------------

    fn notify(
        &self,
        op: Operation,
        table: &TableRef,
        rows: Option<Vec<Row>>,
        in_transaction: bool,
    ) -> Result<()> {
        if !self.connected.get() {
            log::debug!("dropping {:?} notification while disconnected", op);
            return Ok(());
        }
        let notification = PendingNotification::new(op, table.clone(), rows);
        if in_transaction {
            self.tx_notifications.borrow_mut().push(notification);
            return Ok(());
        }
        self.dispatch(notification)
    }

    /// Dispatches one notification, deferring any raised re-entrantly
    /// while the fan-out is in progress. A nested reload must never
    /// mutate the registries being iterated.
    fn dispatch(&self, notification: PendingNotification) -> Result<()> {
        if self.dispatching.get() {
            self.deferred.borrow_mut().push(notification);
            return Ok(());
        }
        self.dispatching.set(true);

        let mut first_error = None;
        let mut current = Some(notification);
        while let Some(n) = current {
            if let Err(e) = self.dispatch_one(&n) {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            current = {
                let mut deferred = self.deferred.borrow_mut();
                if deferred.is_empty() {
                    None
                } else {
                    Some(deferred.remove(0))
                }
            };
        }

        self.dispatching.set(false);
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn dispatch_one(&self, notification: &PendingNotification) -> Result<()> {
        match notification.op {
            Operation::Create | Operation::Delete => {
                for view in self.views_for(notification.table.id()) {
                    let affected = match &notification.rows {
                        Some(rows) => view
                            .filter()
                            .would_affect_rows(rows, MISSING_COLUMNS_AFFECTED),
                        None => true,
                    };
                    if affected {
                        self.reload(&view, None)?;
                    } else {
                        log::debug!(
                            "view {} unaffected by {:?} on {}",
                            view.view_id(),
                            notification.op,
                            notification.table.name()
                        );
                    }
                }
                Ok(())
            }
            Operation::Update => {
                let rows = match &notification.rows {
                    Some(rows) => rows,
                    None => return Ok(()),
                };
                let statement = sql::select_by_id_statement(notification.table.name());
                for row in rows {
                    let cached = self.cached_row_view(notification.table.id(), row.id());
                    let view = match cached {
                        Some(view) => view,
                        // An update never inserts a row into a view it was
                        // not already part of.
                        None => continue,
                    };
                    match self.with_ambient(|c| {
                        self.engine.get(c, &statement, &[Value::Int(row.id())])
                    }) {
                        Ok(fresh) => view.on_row_updated(fresh),
                        Err(e) if e.is_row_not_found() => {
                            // Deleted concurrently: a no-op, not an error.
                            log::warn!(
                                "row {} in {} vanished before update refetch",
                                row.id(),
                                notification.table.name()
                            );
                        }
                        Err(e) => return Err(e.context("Failed to fetch rows")),
                    }
                }
                Ok(())
            }
            Operation::Alter => {
                for view in self.views_for(notification.table.id()) {
                    self.reload(&view, None)?;
                }
                Ok(())
            }
        }
    }
}
