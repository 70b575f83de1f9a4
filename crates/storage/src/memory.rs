//! In-memory reference engine.
//!
//! A schema-less row store interpreting the SQL dialect the database layer
//! emits. Tables are created on first insert; unknown tables read as empty.
//! Each connection may hold one open transaction whose journal is replayed
//! in reverse on rollback.
//!
//! The engine applies mutations immediately and undoes them on rollback.
//! It provides atomicity for the single logical writer this layer assumes,
//! not isolation between concurrent connections.

use crate::contract::{EngineConfig, RowStoreEngine, RunResult};
use crate::sql::{
    self, eval_where, resolve_operand, sort_rows, Projection, SetExpr, SqlOperand, Statement,
    WhereExpr,
};
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::{HashMap, HashSet};
use vitrine_core::{Error, Result, Row, RowId, Value};

/// Opaque connection handle issued by [`MemoryEngine::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryConn {
    id: u64,
}

/// One recorded change, undone in reverse order on rollback.
#[derive(Clone, Debug)]
enum JournalEntry {
    Insert {
        table: String,
        row_id: RowId,
    },
    Update {
        table: String,
        old: Row,
    },
    Delete {
        table: String,
        row: Row,
    },
    AddColumn {
        table: String,
        column: String,
    },
    DropColumn {
        table: String,
        column: String,
        removed: Vec<(RowId, Value)>,
    },
}

#[derive(Default)]
struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    fn rollback(self, tables: &mut BTreeMap<String, TableData>) {
        for entry in self.entries.into_iter().rev() {
            match entry {
                JournalEntry::Insert { table, row_id } => {
                    if let Some(data) = tables.get_mut(&table) {
                        data.rows.remove(&row_id);
                    }
                }
                JournalEntry::Update { table, old } => {
                    if let Some(data) = tables.get_mut(&table) {
                        data.rows.insert(old.id(), old);
                    }
                }
                JournalEntry::Delete { table, row } => {
                    if let Some(data) = tables.get_mut(&table) {
                        data.rows.insert(row.id(), row);
                    }
                }
                JournalEntry::AddColumn { table, column } => {
                    if let Some(data) = tables.get_mut(&table) {
                        for row in data.rows.values_mut() {
                            row.remove(&column);
                        }
                    }
                }
                JournalEntry::DropColumn {
                    table,
                    column,
                    removed,
                } => {
                    if let Some(data) = tables.get_mut(&table) {
                        for (row_id, value) in removed {
                            if let Some(row) = data.rows.get_mut(&row_id) {
                                row.set(column.clone(), value);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[derive(Default)]
struct TableData {
    rows: BTreeMap<RowId, Row>,
}

impl TableData {
    fn next_row_id(&self) -> RowId {
        self.rows.keys().next_back().map(|id| id + 1).unwrap_or(1)
    }
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, TableData>,
    next_conn_id: u64,
    open_conns: HashSet<u64>,
    journals: HashMap<u64, Journal>,
    last_insert_row_id: RowId,
}

impl State {
    fn check_conn(&self, conn: &MemoryConn) -> Result<()> {
        if self.open_conns.contains(&conn.id) {
            Ok(())
        } else {
            Err(Error::invalid_operation("connection is not open"))
        }
    }

    fn record(&mut self, conn_id: u64, entry: JournalEntry) {
        if let Some(journal) = self.journals.get_mut(&conn_id) {
            journal.entries.push(entry);
        }
    }

    fn execute(
        &mut self,
        conn_id: u64,
        statement: Statement,
        binds: &[Value],
    ) -> Result<RunResult> {
        match statement {
            Statement::Begin => {
                if self.journals.contains_key(&conn_id) {
                    return Err(Error::invalid_operation(
                        "transaction already open on this connection",
                    ));
                }
                log::debug!("memory engine: BEGIN on conn {}", conn_id);
                self.journals.insert(conn_id, Journal::default());
                Ok(self.no_rows_result(0))
            }
            Statement::Commit => {
                if self.journals.remove(&conn_id).is_none() {
                    return Err(Error::invalid_operation("no open transaction to commit"));
                }
                log::debug!("memory engine: COMMIT on conn {}", conn_id);
                Ok(self.no_rows_result(0))
            }
            Statement::Rollback => match self.journals.remove(&conn_id) {
                Some(journal) => {
                    log::debug!("memory engine: ROLLBACK on conn {}", conn_id);
                    journal.rollback(&mut self.tables);
                    Ok(self.no_rows_result(0))
                }
                None => Err(Error::invalid_operation("no open transaction to roll back")),
            },
            Statement::Insert {
                table,
                columns,
                values,
            } => self.insert(conn_id, table, columns, values, binds),
            Statement::Update {
                table,
                assignments,
                filter,
            } => self.update(conn_id, table, assignments, filter, binds),
            Statement::Delete { table, filter } => self.delete(conn_id, table, filter, binds),
            Statement::AlterAddColumn { table, column } => {
                self.tables.entry(table.clone()).or_default();
                self.record(conn_id, JournalEntry::AddColumn { table, column });
                Ok(self.no_rows_result(0))
            }
            Statement::AlterDropColumn { table, column } => {
                let mut removed = Vec::new();
                if let Some(data) = self.tables.get_mut(&table) {
                    for (row_id, row) in data.rows.iter_mut() {
                        if let Some(value) = row.remove(&column) {
                            removed.push((*row_id, value));
                        }
                    }
                }
                let affected = removed.len() as u64;
                self.record(
                    conn_id,
                    JournalEntry::DropColumn {
                        table,
                        column,
                        removed,
                    },
                );
                Ok(self.no_rows_result(affected))
            }
            Statement::Select { .. } => Err(Error::invalid_operation(
                "queries must go through all() or get()",
            )),
        }
    }

    fn no_rows_result(&self, rows_affected: u64) -> RunResult {
        RunResult {
            last_insert_row_id: self.last_insert_row_id,
            rows_affected,
        }
    }

    fn insert(
        &mut self,
        conn_id: u64,
        table: String,
        columns: Vec<String>,
        values: Vec<SqlOperand>,
        binds: &[Value],
    ) -> Result<RunResult> {
        let mut resolved: Vec<(String, Value)> = Vec::with_capacity(columns.len());
        for (column, operand) in columns.into_iter().zip(values.into_iter()) {
            resolved.push((column, resolve_operand(&operand, binds)?));
        }

        let data = self.tables.entry(table.clone()).or_default();
        let explicit_id = resolved
            .iter()
            .find(|(column, _)| column == "id")
            .and_then(|(_, value)| value.as_int())
            .filter(|id| *id != 0);
        let row_id = match explicit_id {
            Some(id) => {
                if data.rows.contains_key(&id) {
                    return Err(Error::invalid_operation(alloc::format!(
                        "duplicate row id {} in table {}",
                        id,
                        table
                    )));
                }
                id
            }
            None => data.next_row_id(),
        };

        let mut row = Row::new(row_id);
        for (column, value) in resolved {
            if column != "id" {
                row.set(column, value);
            }
        }
        data.rows.insert(row_id, row);
        self.last_insert_row_id = row_id;
        self.record(conn_id, JournalEntry::Insert { table, row_id });
        Ok(RunResult {
            last_insert_row_id: row_id,
            rows_affected: 1,
        })
    }

    fn update(
        &mut self,
        conn_id: u64,
        table: String,
        assignments: Vec<sql::Assignment>,
        filter: Option<WhereExpr>,
        binds: &[Value],
    ) -> Result<RunResult> {
        // Resolve assignment operands up front so bind errors surface even
        // when no row matches.
        enum Applied {
            Value(String, Value),
            Replace(String, String, String, String),
        }
        let mut applied = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            match assignment.expr {
                SetExpr::Value(operand) => {
                    applied.push(Applied::Value(
                        assignment.column,
                        resolve_operand(&operand, binds)?,
                    ));
                }
                SetExpr::Replace {
                    source,
                    search,
                    replacement,
                } => {
                    let search = resolve_operand(&search, binds)?.to_string();
                    let replacement = resolve_operand(&replacement, binds)?.to_string();
                    applied.push(Applied::Replace(
                        assignment.column,
                        source,
                        search,
                        replacement,
                    ));
                }
            }
        }

        let matching: Vec<RowId> = match self.tables.get(&table) {
            Some(data) => {
                let mut ids = Vec::new();
                for row in data.rows.values() {
                    let keep = match &filter {
                        Some(expr) => eval_where(expr, row, binds)?,
                        None => true,
                    };
                    if keep {
                        ids.push(row.id());
                    }
                }
                ids
            }
            None => Vec::new(),
        };

        let mut affected = 0u64;
        for row_id in matching {
            let data = self.tables.get_mut(&table).expect("table existed above");
            let row = data.rows.get_mut(&row_id).expect("row id collected above");
            let old = row.clone();
            for change in &applied {
                match change {
                    Applied::Value(column, value) => {
                        if column != "id" {
                            row.set(column.clone(), value.clone());
                        }
                    }
                    Applied::Replace(column, source, search, replacement) => {
                        if let Some(Value::Text(text)) = row.get(source) {
                            let replaced = text.replace(search.as_str(), replacement);
                            row.set(column.clone(), Value::Text(replaced));
                        }
                    }
                }
            }
            affected += 1;
            self.record(conn_id, JournalEntry::Update { table: table.clone(), old });
        }
        Ok(self.no_rows_result(affected))
    }

    fn delete(
        &mut self,
        conn_id: u64,
        table: String,
        filter: Option<WhereExpr>,
        binds: &[Value],
    ) -> Result<RunResult> {
        let matching: Vec<RowId> = match self.tables.get(&table) {
            Some(data) => {
                let mut ids = Vec::new();
                for row in data.rows.values() {
                    let keep = match &filter {
                        Some(expr) => eval_where(expr, row, binds)?,
                        None => true,
                    };
                    if keep {
                        ids.push(row.id());
                    }
                }
                ids
            }
            None => Vec::new(),
        };

        let mut affected = 0u64;
        for row_id in matching {
            let data = self.tables.get_mut(&table).expect("table existed above");
            if let Some(row) = data.rows.remove(&row_id) {
                affected += 1;
                self.record(conn_id, JournalEntry::Delete { table: table.clone(), row });
            }
        }
        Ok(self.no_rows_result(affected))
    }

    fn query(&self, statement: &Statement, binds: &[Value]) -> Result<Vec<Row>> {
        let (table, projection, filter, order_by, limit, offset) = match statement {
            Statement::Select {
                table,
                projection,
                filter,
                order_by,
                limit,
                offset,
            } => (table, projection, filter, order_by, limit, offset),
            _ => {
                return Err(Error::invalid_operation(
                    "expected a query, got a mutation",
                ))
            }
        };

        // Unknown tables read as empty in the schema-less store.
        let mut rows: Vec<Row> = Vec::new();
        if let Some(data) = self.tables.get(table) {
            for row in data.rows.values() {
                let keep = match filter {
                    Some(expr) => eval_where(expr, row, binds)?,
                    None => true,
                };
                if keep {
                    rows.push(row.clone());
                }
            }
        }

        if let Projection::CountStar { alias } = projection {
            let name = alias.as_deref().unwrap_or("count");
            let count_row = Row::unassigned().with(name, rows.len() as i64);
            return Ok(alloc::vec![count_row]);
        }

        sort_rows(&mut rows, order_by);
        let skip = offset.unwrap_or(0) as usize;
        let rows: Vec<Row> = match limit {
            Some(limit) => rows.into_iter().skip(skip).take(*limit as usize).collect(),
            None => rows.into_iter().skip(skip).collect(),
        };
        Ok(rows)
    }
}

/// The in-memory reference engine. Cloning the handle shares the store.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    state: Rc<RefCell<State>>,
}

impl MemoryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/introspection helper: a snapshot of all rows of a table in id
    /// order. Unknown tables read as empty.
    pub fn table_rows(&self, table: &str) -> Vec<Row> {
        self.state
            .borrow()
            .tables
            .get(table)
            .map(|data| data.rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl RowStoreEngine for MemoryEngine {
    type Conn = MemoryConn;

    fn open(&self, _config: &EngineConfig) -> Result<MemoryConn> {
        let mut state = self.state.borrow_mut();
        state.next_conn_id += 1;
        let id = state.next_conn_id;
        state.open_conns.insert(id);
        Ok(MemoryConn { id })
    }

    fn close(&self, conn: MemoryConn) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.check_conn(&conn)?;
        // Closing with an open transaction rolls it back.
        if let Some(journal) = state.journals.remove(&conn.id) {
            log::warn!(
                "memory engine: conn {} closed with open transaction, rolling back",
                conn.id
            );
            journal.rollback(&mut state.tables);
        }
        state.open_conns.remove(&conn.id);
        Ok(())
    }

    fn exec(&self, conn: &MemoryConn, sql: &str) -> Result<()> {
        log::trace!("memory engine exec: {}", sql);
        let statement = sql::parse(sql)?;
        let mut state = self.state.borrow_mut();
        state.check_conn(conn)?;
        state.execute(conn.id, statement, &[])?;
        Ok(())
    }

    fn run(&self, conn: &MemoryConn, sql: &str, binds: &[Value]) -> Result<RunResult> {
        log::trace!("memory engine run: {}", sql);
        let statement = sql::parse(sql)?;
        let mut state = self.state.borrow_mut();
        state.check_conn(conn)?;
        state.execute(conn.id, statement, binds)
    }

    fn all(&self, conn: &MemoryConn, sql: &str, binds: &[Value]) -> Result<Vec<Row>> {
        log::trace!("memory engine all: {}", sql);
        let statement = sql::parse(sql)?;
        let state = self.state.borrow();
        state.check_conn(conn)?;
        state.query(&statement, binds)
    }

    fn get(&self, conn: &MemoryConn, sql: &str, binds: &[Value]) -> Result<Row> {
        log::trace!("memory engine get: {}", sql);
        let statement = sql::parse(sql)?;
        let state = self.state.borrow();
        state.check_conn(conn)?;
        let rows = state.query(&statement, binds)?;
        rows.into_iter().next().ok_or_else(|| {
            let (table, id) = match &statement {
                Statement::Select { table, filter, .. } => {
                    (table.clone(), id_from_filter(filter, binds))
                }
                _ => (String::new(), 0),
            };
            Error::row_not_found(table, id)
        })
    }
}

/// Best-effort id extraction for row-not-found errors on point lookups.
fn id_from_filter(filter: &Option<WhereExpr>, binds: &[Value]) -> RowId {
    if let Some(WhereExpr::Compare {
        column,
        op: sql::CompareOp::Eq,
        rhs,
    }) = filter
    {
        if column == "id" {
            if let Ok(value) = resolve_operand(rhs, binds) {
                return value.as_int().unwrap_or(0);
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with_conn() -> (MemoryEngine, MemoryConn) {
        let engine = MemoryEngine::new();
        let conn = engine.open(&EngineConfig::new("test")).unwrap();
        (engine, conn)
    }

    fn seed(engine: &MemoryEngine, conn: &MemoryConn, id: i64, name: &str, ty: i64) {
        engine
            .run(
                conn,
                "INSERT INTO routines (id, name, type) VALUES (?, ?, ?);",
                &[Value::Int(id), Value::Text(name.into()), Value::Int(ty)],
            )
            .unwrap();
    }

    #[test]
    fn insert_assigns_ids_and_reports_them() {
        let (engine, conn) = engine_with_conn();
        let result = engine
            .run(
                &conn,
                "INSERT INTO routines (name) VALUES (?);",
                &[Value::Text("first".into())],
            )
            .unwrap();
        assert_eq!(result.last_insert_row_id, 1);
        assert_eq!(result.rows_affected, 1);

        seed(&engine, &conn, 10, "tenth", 0);
        let result = engine
            .run(
                &conn,
                "INSERT INTO routines (name) VALUES (?);",
                &[Value::Text("next".into())],
            )
            .unwrap();
        assert_eq!(result.last_insert_row_id, 11);
    }

    #[test]
    fn duplicate_explicit_id_is_rejected() {
        let (engine, conn) = engine_with_conn();
        seed(&engine, &conn, 1, "a", 0);
        let err = engine
            .run(
                &conn,
                "INSERT INTO routines (id, name) VALUES (?, ?);",
                &[Value::Int(1), Value::Text("b".into())],
            )
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn select_where_order_window() {
        let (engine, conn) = engine_with_conn();
        for i in 1..=6 {
            seed(&engine, &conn, i, "row", i % 2);
        }
        let rows = engine
            .all(
                &conn,
                "SELECT * FROM routines WHERE type = 0 ORDER BY id DESC LIMIT 2 OFFSET 1",
                &[],
            )
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id()).collect();
        assert_eq!(ids, [4, 2]);
    }

    #[test]
    fn select_unknown_table_reads_empty() {
        let (engine, conn) = engine_with_conn();
        let rows = engine.all(&conn, "SELECT * FROM nothing", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn count_star_with_alias() {
        let (engine, conn) = engine_with_conn();
        seed(&engine, &conn, 1, "a", 0);
        seed(&engine, &conn, 2, "b", 1);
        let row = engine
            .get(
                &conn,
                "SELECT COUNT(*) as count FROM routines WHERE type = 0",
                &[],
            )
            .unwrap();
        assert_eq!(row.get("count"), Some(&Value::Int(1)));
    }

    #[test]
    fn update_with_binds() {
        let (engine, conn) = engine_with_conn();
        seed(&engine, &conn, 1, "old", 0);
        let result = engine
            .run(
                &conn,
                "UPDATE routines SET name = ?, type = ? WHERE id = ?;",
                &[Value::Text("new".into()), Value::Int(5), Value::Int(1)],
            )
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        let row = engine
            .get(&conn, "SELECT * FROM routines WHERE id = ?", &[Value::Int(1)])
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::Text("new".into())));
        assert_eq!(row.get("type"), Some(&Value::Int(5)));
    }

    #[test]
    fn update_replace_applies_to_text() {
        let (engine, conn) = engine_with_conn();
        seed(&engine, &conn, 1, "say hello twice hello", 0);
        engine
            .run(
                &conn,
                "UPDATE routines SET name = REPLACE(name, ?, ?) WHERE type = 0;",
                &[Value::Text("hello".into()), Value::Text("bye".into())],
            )
            .unwrap();
        let row = engine
            .get(&conn, "SELECT * FROM routines WHERE id = ?", &[Value::Int(1)])
            .unwrap();
        assert_eq!(row.get("name"), Some(&Value::Text("say bye twice bye".into())));
    }

    #[test]
    fn delete_in_list() {
        let (engine, conn) = engine_with_conn();
        for i in 1..=4 {
            seed(&engine, &conn, i, "row", 0);
        }
        engine
            .exec(&conn, "DELETE FROM routines WHERE id IN (1, 3)")
            .unwrap();
        let ids: Vec<i64> = engine.table_rows("routines").iter().map(|r| r.id()).collect();
        assert_eq!(ids, [2, 4]);
    }

    #[test]
    fn get_missing_row_is_row_not_found() {
        let (engine, conn) = engine_with_conn();
        let err = engine
            .get(&conn, "SELECT * FROM routines WHERE id = ?", &[Value::Int(9)])
            .unwrap_err();
        assert!(err.is_row_not_found());
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn transaction_commit_keeps_changes() {
        let (engine, conn) = engine_with_conn();
        engine.exec(&conn, "BEGIN;").unwrap();
        seed(&engine, &conn, 1, "a", 0);
        engine.exec(&conn, "COMMIT;").unwrap();
        assert_eq!(engine.table_rows("routines").len(), 1);
    }

    #[test]
    fn transaction_rollback_restores_prior_state() {
        let (engine, conn) = engine_with_conn();
        seed(&engine, &conn, 1, "keep", 7);

        engine.exec(&conn, "BEGIN;").unwrap();
        seed(&engine, &conn, 2, "drop me", 0);
        engine
            .run(
                &conn,
                "UPDATE routines SET name = ? WHERE id = ?;",
                &[Value::Text("mutated".into()), Value::Int(1)],
            )
            .unwrap();
        engine
            .exec(&conn, "DELETE FROM routines WHERE id IN (1)")
            .unwrap();
        engine.exec(&conn, "ROLLBACK;").unwrap();

        let rows = engine.table_rows("routines");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("keep".into())));
        assert_eq!(rows[0].get("type"), Some(&Value::Int(7)));
    }

    #[test]
    fn close_with_open_transaction_rolls_back() {
        let (engine, conn) = engine_with_conn();
        engine.exec(&conn, "BEGIN;").unwrap();
        seed(&engine, &conn, 1, "a", 0);
        engine.close(conn).unwrap();
        assert!(engine.table_rows("routines").is_empty());
    }

    #[test]
    fn transaction_state_errors() {
        let (engine, conn) = engine_with_conn();
        assert!(engine.exec(&conn, "COMMIT;").is_err());
        assert!(engine.exec(&conn, "ROLLBACK;").is_err());
        engine.exec(&conn, "BEGIN;").unwrap();
        assert!(engine.exec(&conn, "BEGIN;").is_err());
    }

    #[test]
    fn closed_connection_is_rejected() {
        let (engine, conn) = engine_with_conn();
        engine.close(conn).unwrap();
        assert!(engine.exec(&conn, "BEGIN;").is_err());
        assert!(engine.all(&conn, "SELECT * FROM routines", &[]).is_err());
    }

    #[test]
    fn alter_drop_column_and_rollback() {
        let (engine, conn) = engine_with_conn();
        seed(&engine, &conn, 1, "a", 3);

        engine.exec(&conn, "BEGIN;").unwrap();
        engine
            .exec(&conn, "ALTER TABLE routines DROP COLUMN type")
            .unwrap();
        assert_eq!(engine.table_rows("routines")[0].get("type"), None);
        engine.exec(&conn, "ROLLBACK;").unwrap();
        assert_eq!(
            engine.table_rows("routines")[0].get("type"),
            Some(&Value::Int(3))
        );
    }

    #[test]
    fn separate_connections_share_the_store() {
        let (engine, conn_a) = engine_with_conn();
        let conn_b = engine.open(&EngineConfig::new("test")).unwrap();
        seed(&engine, &conn_a, 1, "a", 0);
        let rows = engine.all(&conn_b, "SELECT * FROM routines", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
