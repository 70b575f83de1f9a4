//! Property tests: the in-memory predicate agrees with the engine's SQL
//! evaluation for leaf filters.
//!
//! Unparenthesized mixed AND/OR chains and bare LIKE patterns are outside
//! the parity contract (left-to-right fold vs SQL precedence, unanchored
//! vs anchored matching) and are deliberately not generated here; the
//! `%…%` contains-form of LIKE matches on both sides and is included.

use proptest::prelude::*;
use vitrine_database::{
    query, EngineConfig, Filter, MemoryEngine, Row, RowStoreEngine, Value,
};

fn seed_rows(engine: &MemoryEngine, values: &[i64]) -> Vec<Row> {
    let conn = engine.open(&EngineConfig::new("parity")).unwrap();
    let mut rows = Vec::new();
    for (i, &value) in values.iter().enumerate() {
        engine
            .run(
                &conn,
                "INSERT INTO t (id, n) VALUES (?, ?);",
                &[Value::Int(i as i64 + 1), Value::Int(value)],
            )
            .unwrap();
        rows.push(Row::new(i as i64 + 1).with("n", value));
    }
    engine.close(conn).unwrap();
    rows
}

fn selected_ids(engine: &MemoryEngine, filter: &Filter) -> Vec<i64> {
    let conn = engine.open(&EngineConfig::new("parity")).unwrap();
    let sql = format!("SELECT * FROM t {}", filter);
    let rows = engine.all(&conn, &sql, &[]).unwrap();
    engine.close(conn).unwrap();
    rows.iter().map(|row| row.id()).collect()
}

fn leaf_filter(op_index: usize, operand: i64) -> Filter {
    let pred = query().where_().column("n");
    let link = match op_index {
        0 => pred.eq(operand),
        1 => pred.ne(operand),
        2 => pred.lt(operand),
        3 => pred.lte(operand),
        4 => pred.gt(operand),
        _ => pred.gte(operand),
    };
    link.end_where().build().unwrap()
}

proptest! {
    /// For every comparison leaf, `would_affect_row` agrees with the SQL
    /// predicate's truth value on every row.
    #[test]
    fn comparison_leaves_agree_with_sql(
        op_index in 0usize..6,
        operand in -20i64..20,
        values in prop::collection::vec(-20i64..20, 0..30),
    ) {
        let engine = MemoryEngine::new();
        let rows = seed_rows(&engine, &values);
        let filter = leaf_filter(op_index, operand);

        let from_sql = selected_ids(&engine, &filter);
        let from_memory: Vec<i64> = rows
            .iter()
            .filter(|row| filter.would_affect_row(row, false))
            .map(|row| row.id())
            .collect();
        prop_assert_eq!(from_sql, from_memory);
    }

    /// IN / NOT IN agree with SQL list membership.
    #[test]
    fn in_list_leaves_agree_with_sql(
        negated in any::<bool>(),
        list in prop::collection::vec(-10i64..10, 1..8),
        values in prop::collection::vec(-10i64..10, 0..30),
    ) {
        let engine = MemoryEngine::new();
        let rows = seed_rows(&engine, &values);
        let pred = query().where_().column("n");
        let link = if negated {
            pred.not_in(list.clone())
        } else {
            pred.is_in(list.clone())
        };
        let filter = link.end_where().build().unwrap();

        let from_sql = selected_ids(&engine, &filter);
        let from_memory: Vec<i64> = rows
            .iter()
            .filter(|row| filter.would_affect_row(row, false))
            .map(|row| row.id())
            .collect();
        prop_assert_eq!(from_sql, from_memory);
    }

    /// The `%needle%` contains-form of LIKE matches identically on both
    /// sides of the parity layer.
    #[test]
    fn contains_like_agrees_with_sql(
        needle in "[a-z]{0,3}",
        values in prop::collection::vec("[a-z]{0,6}", 0..20),
    ) {
        let engine = MemoryEngine::new();
        let conn = engine.open(&EngineConfig::new("parity")).unwrap();
        let mut rows = Vec::new();
        for (i, value) in values.iter().enumerate() {
            engine
                .run(
                    &conn,
                    "INSERT INTO t (id, name) VALUES (?, ?);",
                    &[Value::Int(i as i64 + 1), Value::Text(value.clone())],
                )
                .unwrap();
            rows.push(Row::new(i as i64 + 1).with("name", value.as_str()));
        }
        engine.close(conn).unwrap();

        let filter = query()
            .where_()
            .column("name")
            .like(format!("%{}%", needle))
            .end_where()
            .build()
            .unwrap();

        let from_sql = selected_ids(&engine, &filter);
        let from_memory: Vec<i64> = rows
            .iter()
            .filter(|row| filter.would_affect_row(row, false))
            .map(|row| row.id())
            .collect();
        prop_assert_eq!(from_sql, from_memory);
    }

    /// Windowed selects return the id-ordered slice the limit/offset pair
    /// describes.
    #[test]
    fn limit_offset_windows_are_exact(
        count in 0usize..20,
        limit in 0u64..25,
        offset in 0u64..25,
    ) {
        let engine = MemoryEngine::new();
        let values: Vec<i64> = (0..count as i64).collect();
        seed_rows(&engine, &values);

        let filter = query().limit(limit).offset(offset).build().unwrap();
        let ids = selected_ids(&engine, &filter);

        let expected: Vec<i64> = (1..=count as i64)
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        prop_assert_eq!(ids, expected);
    }
}
