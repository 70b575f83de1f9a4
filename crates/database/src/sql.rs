//! SQL statement generation.
//!
//! All statements use positional `?` binds. Booleans are lowered to 1/0
//! at the bind layer; the row store persists booleans as integers.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use vitrine_core::{Row, RowId, Value};
use vitrine_filter::Filter;

/// Lowers a value for binding: booleans become the integers the store
/// persists them as.
fn lower(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Int(*b as i64),
        other => other.clone(),
    }
}

/// `INSERT INTO t (a, b) VALUES (?, ?);` over the row's fields. The `id`
/// field is included only once the row carries an assigned id (explicit-id
/// inserts are how undo/restore keeps identities stable).
pub fn insert_statement(table: &str, row: &Row) -> (String, Vec<Value>) {
    let mut columns = String::new();
    let mut placeholders = String::new();
    let mut binds = Vec::new();
    for (name, value) in row.fields() {
        if name == "id" && !row.is_assigned() {
            continue;
        }
        if !binds.is_empty() {
            columns.push_str(", ");
            placeholders.push_str(", ");
        }
        columns.push_str(name);
        placeholders.push('?');
        binds.push(lower(value));
    }
    (
        format!(
            "INSERT INTO {} ({}) VALUES ({});",
            table, columns, placeholders
        ),
        binds,
    )
}

/// `UPDATE t SET a = ?, b = ? WHERE id = ?;`. The id is never assigned,
/// only used as the key.
pub fn update_statement(table: &str, row: &Row) -> (String, Vec<Value>) {
    let mut assignments = String::new();
    let mut binds = Vec::new();
    for (name, value) in row.fields() {
        if name == "id" {
            continue;
        }
        if !binds.is_empty() {
            assignments.push_str(", ");
        }
        assignments.push_str(name);
        assignments.push_str(" = ?");
        binds.push(lower(value));
    }
    binds.push(Value::Int(row.id()));
    (
        format!("UPDATE {} SET {} WHERE id = ?;", table, assignments),
        binds,
    )
}

/// `DELETE FROM t WHERE id IN (1, 2, 3)`.
pub fn delete_statement(table: &str, ids: &[RowId]) -> String {
    let mut list = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            list.push_str(", ");
        }
        list.push_str(&format!("{}", id));
    }
    format!("DELETE FROM {} WHERE id IN ({})", table, list)
}

/// `SELECT * FROM t <filter suffix>`.
pub fn select_statement(table: &str, filter: &Filter) -> String {
    let suffix = format!("{}", filter);
    if suffix.is_empty() {
        format!("SELECT * FROM {}", table)
    } else {
        format!("SELECT * FROM {} {}", table, suffix)
    }
}

/// `SELECT COUNT(*) as count FROM t <where clause>`. The count ignores
/// ordering and the pagination window by construction.
pub fn count_statement(table: &str, filter: &Filter) -> String {
    let clause = filter.where_clause();
    if clause.is_empty() {
        format!("SELECT COUNT(*) as count FROM {}", table)
    } else {
        format!("SELECT COUNT(*) as count FROM {} {}", table, clause)
    }
}

/// Point lookup used by update dispatch.
pub fn select_by_id_statement(table: &str) -> String {
    format!("SELECT * FROM {} WHERE id = ?", table)
}

/// `ALTER TABLE t ADD COLUMN name TYPE;`
pub fn add_column_statement(table: &str, column: &str, column_type: &str) -> String {
    format!("ALTER TABLE {} ADD COLUMN {} {};", table, column, column_type)
}

/// `ALTER TABLE t DROP COLUMN name`
pub fn drop_column_statement(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", table, column)
}

/// `UPDATE t SET col = REPLACE(col, ?, ?) <where clause>;` for bulk
/// search-and-replace.
pub fn replace_statement(table: &str, column: &str, filter: &Filter) -> String {
    let clause = filter.where_clause();
    if clause.is_empty() {
        format!("UPDATE {} SET {} = REPLACE({}, ?, ?);", table, column, column)
    } else {
        format!(
            "UPDATE {} SET {} = REPLACE({}, ?, ?) {};",
            table, column, column, clause
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use vitrine_filter::query;

    #[test]
    fn insert_skips_unassigned_id() {
        let row = Row::unassigned().with("name", "Alice").with("flag", true);
        let (sql, binds) = insert_statement("routines", &row);
        assert_eq!(sql, "INSERT INTO routines (flag, name) VALUES (?, ?);");
        assert_eq!(binds, vec![Value::Int(1), Value::Text("Alice".into())]);
    }

    #[test]
    fn insert_keeps_explicit_id() {
        let row = Row::new(7).with("name", "Alice");
        let (sql, binds) = insert_statement("routines", &row);
        assert_eq!(sql, "INSERT INTO routines (id, name) VALUES (?, ?);");
        assert_eq!(binds, vec![Value::Int(7), Value::Text("Alice".into())]);
    }

    #[test]
    fn update_keys_on_id() {
        let row = Row::new(3).with("name", "Bob").with("done", false);
        let (sql, binds) = update_statement("routines", &row);
        assert_eq!(sql, "UPDATE routines SET done = ?, name = ? WHERE id = ?;");
        assert_eq!(
            binds,
            vec![Value::Int(0), Value::Text("Bob".into()), Value::Int(3)]
        );
    }

    #[test]
    fn delete_renders_id_list() {
        assert_eq!(
            delete_statement("routines", &[1, 2, 3]),
            "DELETE FROM routines WHERE id IN (1, 2, 3)"
        );
    }

    #[test]
    fn select_and_count_use_the_filter() {
        let filter = query()
            .where_()
            .column("type")
            .eq(0i64)
            .end_where()
            .limit(10)
            .build()
            .unwrap();
        assert_eq!(
            select_statement("routines", &filter),
            "SELECT * FROM routines WHERE type = 0 LIMIT 10"
        );
        // COUNT drops the window, keeping only the WHERE clause.
        assert_eq!(
            count_statement("routines", &filter),
            "SELECT COUNT(*) as count FROM routines WHERE type = 0"
        );

        let all = Filter::all();
        assert_eq!(select_statement("routines", &all), "SELECT * FROM routines");
        assert_eq!(
            count_statement("routines", &all),
            "SELECT COUNT(*) as count FROM routines"
        );
    }

    #[test]
    fn alter_and_replace_statements() {
        assert_eq!(
            add_column_statement("routines", "note", "TEXT"),
            "ALTER TABLE routines ADD COLUMN note TEXT;"
        );
        assert_eq!(
            drop_column_statement("routines", "note"),
            "ALTER TABLE routines DROP COLUMN note"
        );
        let filter = query().where_().column("type").eq(0i64).end_where().build().unwrap();
        assert_eq!(
            replace_statement("routines", "name", &filter),
            "UPDATE routines SET name = REPLACE(name, ?, ?) WHERE type = 0;"
        );
    }
}
