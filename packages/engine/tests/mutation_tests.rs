//! Tests for serialized table operations

use gridweave_engine::{
    classify, EngineConfig, NewColumn, SortDirection, SortKind, TableEngine, TableOp,
};

fn engine_with(headers: &[&str], rows: &[&[&str]]) -> TableEngine {
    let mut engine = TableEngine::new(EngineConfig::default()).unwrap();
    let columns: Vec<NewColumn> = headers.iter().map(|name| NewColumn::named(*name)).collect();
    // One blank row comes with the first columns
    engine.insert_columns(0, &columns).unwrap();
    engine.insert_empty_rows(1, rows.len().saturating_sub(1)).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            engine.update_cell(r, headers[c], value).unwrap();
        }
    }
    engine
}

fn column(engine: &TableEngine, name: &str) -> Vec<String> {
    engine.rows().iter().map(|row| row[name].clone()).collect()
}

fn parse_ops(json: &str) -> Vec<TableOp> {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_apply_op_script() {
    let mut engine = TableEngine::new(EngineConfig::default()).unwrap();
    let ops = parse_ops(
        r#"[
            { "op": "insertColumns", "at": 0, "columns": [{ "name": "Item" }, { "name": "Qty" }] },
            { "op": "updateCell", "rowIndex": 0, "name": "Item", "value": "Bolts" },
            { "op": "insertRows", "at": 1, "rows": [{ "Item": "Nuts", "Qty": "1,200" }] },
            { "op": "updateColumnWidth", "name": "Qty", "width": 64 },
            { "op": "editHeader", "index": 0, "name": "Part" },
            { "op": "sortRowsByColumn", "name": "Qty", "direction": "desc" }
        ]"#,
    );

    let results: Vec<_> = ops
        .into_iter()
        .map(|op| engine.apply(op).unwrap())
        .collect();

    assert_eq!(results.iter().map(|r| r.version).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(results[0].affected, 2);
    assert_eq!(results[2].affected, 1);

    assert_eq!(engine.headers(), vec!["Part", "Qty"]);
    assert_eq!(column(&engine, "Part"), vec!["Nuts", "Bolts"]);
    assert_eq!(engine.column_widths()["Qty"], 64.0);
}

#[test]
fn test_noop_ops_report_zero_affected() {
    let mut engine = engine_with(&["A"], &[&["1"]]);

    let ops = vec![
        TableOp::EditHeader {
            index: 3,
            name: "X".to_string(),
        },
        TableOp::DeleteRows { indices: vec![7] },
        TableOp::DeleteColumns { indices: vec![7] },
        TableOp::ReorderColumn { from: 0, to: 0 },
        TableOp::UpdateColumnWidth {
            name: "Nope".to_string(),
            width: 10.0,
        },
        TableOp::LockCellRange {
            row_start: 4,
            row_end: 9,
            column_start: 0,
            column_end: 0,
            note: None,
        },
        TableOp::UnlockAll,
    ];

    for op in ops {
        let name = op.name();
        let result = engine.apply(op).unwrap();
        assert_eq!(result.affected, 0, "{} should be a no-op", name);
        assert_eq!(result.lock_id, None);
    }
}

#[test]
fn test_delete_rows_out_of_order_indices() {
    let mut engine = engine_with(&["N"], &[&["a"], &["b"], &["c"], &["d"], &["e"]]);

    let removed = engine.delete_rows(&[1, 4, 3, 1, 99]).unwrap();
    assert_eq!(removed, 3);
    assert_eq!(column(&engine, "N"), vec!["a", "c"]);
}

#[test]
fn test_delete_columns_descending() {
    let mut engine = engine_with(&["A", "B", "C", "D"], &[&["1", "2", "3", "4"]]);

    let removed = engine.delete_columns(&[0, 2]).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(engine.headers(), vec!["B", "D"]);
    assert_eq!(engine.rows()[0]["D"], "4");
}

#[test]
fn test_insert_columns_pads_short_data() {
    let mut engine = engine_with(&["A"], &[&["1"], &["2"], &["3"]]);

    engine
        .insert_columns(0, &[NewColumn::with_data("Z", ["z1"])])
        .unwrap();
    assert_eq!(engine.headers(), vec!["Z", "A"]);
    assert_eq!(column(&engine, "Z"), vec!["z1", "", ""]);
}

#[test]
fn test_insert_rows_position_is_clamped() {
    let mut engine = engine_with(&["A"], &[&["1"]]);

    let mut row = std::collections::BTreeMap::new();
    row.insert("A".to_string(), "2".to_string());
    engine.insert_rows(500, &[row]).unwrap();

    assert_eq!(column(&engine, "A"), vec!["1", "2"]);
}

#[test]
fn test_numeric_column_sorts_numerically() {
    let mut engine = engine_with(&["V"], &[&["10"], &[""], &["9"], &["1,000"], &["-2.5"]]);

    engine.sort_rows_by_column("V", SortDirection::Ascending).unwrap();
    assert_eq!(column(&engine, "V"), vec!["", "-2.5", "9", "10", "1,000"]);

    engine.sort_rows_by_column("V", SortDirection::Descending).unwrap();
    assert_eq!(column(&engine, "V"), vec!["1,000", "10", "9", "-2.5", ""]);
}

#[test]
fn test_mixed_column_sorts_lexicographically() {
    let mut engine = engine_with(&["V"], &[&["10"], &["b"], &["9"], &["A"]]);
    assert_eq!(classify(["10", "b", "9", "A"]), SortKind::Lexicographic);

    engine.sort_rows_by_column("V", SortDirection::Ascending).unwrap();
    assert_eq!(column(&engine, "V"), vec!["10", "9", "A", "b"]);
}

#[test]
fn test_sort_keeps_ties_in_place() {
    let mut engine = engine_with(
        &["K", "Tag"],
        &[&["1", "first"], &["0", "zero"], &["1", "second"], &["1", "third"]],
    );

    engine.sort_rows_by_column("K", SortDirection::Ascending).unwrap();
    assert_eq!(column(&engine, "Tag"), vec!["zero", "first", "second", "third"]);
}
