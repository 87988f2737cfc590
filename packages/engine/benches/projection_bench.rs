use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridweave_engine::{
    project_locks, project_table, EngineConfig, LegacyTable, SortDirection, TableDocument,
    TableEngine,
};
use serde_json::json;
use std::collections::BTreeMap;
use yrs::Transact;

fn legacy_table(rows: usize, columns: usize) -> LegacyTable {
    let headers: Vec<String> = (0..columns).map(|c| format!("Column {}", c + 1)).collect();
    let rows = (0..rows)
        .map(|r| {
            headers
                .iter()
                .enumerate()
                .map(|(c, header)| (header.clone(), json!(format!("{}", (r * 31 + c * 7) % 997))))
                .collect::<BTreeMap<_, _>>()
        })
        .collect();

    LegacyTable {
        headers,
        rows,
        column_widths: BTreeMap::new(),
    }
}

fn engine(rows: usize, columns: usize) -> TableEngine {
    let document = TableDocument::new();
    document
        .write_legacy_table(&legacy_table(rows, columns))
        .unwrap();
    TableEngine::open(document, EngineConfig::default()).unwrap()
}

fn project_small_table(c: &mut Criterion) {
    let engine = engine(50, 5);
    let document = engine.document();

    c.bench_function("project_table_50x5", |b| {
        b.iter(|| {
            let txn = document.doc().transact();
            black_box(project_table(document.collections(), &txn))
        })
    });
}

fn project_large_table(c: &mut Criterion) {
    let mut engine = engine(1000, 12);
    engine.lock_cell_range(0, 499, 0, 5, Some("frozen")).unwrap();
    let document = engine.document();

    c.bench_function("project_table_1000x12", |b| {
        b.iter(|| {
            let txn = document.doc().transact();
            black_box(project_table(document.collections(), &txn))
        })
    });

    c.bench_function("project_locks_3000_cells", |b| {
        b.iter(|| {
            let txn = document.doc().transact();
            black_box(project_locks(document.collections(), &txn))
        })
    });
}

fn sort_and_reproject(c: &mut Criterion) {
    let mut engine = engine(500, 4);
    let mut direction = SortDirection::Ascending;

    c.bench_function("sort_500_rows", |b| {
        b.iter(|| {
            direction = match direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
            engine
                .sort_rows_by_column(black_box("Column 2"), direction)
                .unwrap()
        })
    });
}

fn migrate_legacy(c: &mut Criterion) {
    let table = legacy_table(200, 8);

    c.bench_function("migrate_200x8", |b| {
        b.iter(|| {
            let document = TableDocument::new();
            document.write_legacy_table(black_box(&table)).unwrap();
            TableEngine::open(document, EngineConfig::default()).unwrap()
        })
    });
}

criterion_group!(
    benches,
    project_small_table,
    project_large_table,
    sort_and_reproject,
    migrate_legacy
);
criterion_main!(benches);
