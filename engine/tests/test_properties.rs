//! FILENAME: tests/test_properties.rs
//! Cross-cutting behavioral laws of the store and the ledger.

mod common;

use common::TestHarness;
use kpi_engine::{Aggregate, CellValue, DataSource, EngineError, JoinType, ReadOptions, Table, TableCodec};

#[test]
fn test_sales_end_to_end() {
    let harness = TestHarness::new();
    let mut store = harness.store();
    let sales = Table::from_rows(
        &["date", "product_id", "sales_amount"],
        vec![
            vec![CellValue::from("2023-01-01"), "P001".into(), 1000.0.into()],
            vec![CellValue::from("2023-02-01"), "P002".into(), 1200.0.into()],
        ],
    )
    .unwrap();
    store.load(sales, "sales").unwrap();

    store.add_column("sales", "half", "sales_amount / 2").unwrap();
    let table = store.get("sales").unwrap();
    assert_eq!(table.rows()[0][3], CellValue::Number(500.0));
    assert_eq!(table.rows()[1][3], CellValue::Number(600.0));
    assert_eq!(store.compute("sales", &["sales_amount"], Aggregate::Sum).unwrap(), vec![2200.0]);
}

#[test]
fn test_division_matches_manual_division_row_by_row() {
    let harness = TestHarness::new();
    let mut store = harness.store();
    let pairs = [(6.0, 3.0), (1.0, 4.0), (-7.5, 2.5), (5.0, 0.0), (0.0, 0.0)];
    let rows: Vec<Vec<f64>> = pairs.iter().map(|&(a, b)| vec![a, b]).collect();
    store.load(Table::from_rows(&["a", "b"], rows).unwrap(), "t").unwrap();

    store.add_column("t", "ratio", "a / b").unwrap();
    for (row, (a, b)) in store.get("t").unwrap().rows().iter().zip(pairs) {
        let expected = a / b;
        match row[2] {
            CellValue::Number(n) if expected.is_nan() => assert!(n.is_nan()),
            CellValue::Number(n) => assert_eq!(n, expected),
            ref other => panic!("unexpected cell {:?}", other),
        }
    }
}

#[test]
fn test_empty_column_sum_is_zero_mean_is_error() {
    let harness = TestHarness::new();
    let mut store = harness.store();
    store
        .load(Table::empty(vec!["amount".to_string()]).unwrap(), "empty")
        .unwrap();

    assert_eq!(store.compute("empty", &["amount"], Aggregate::Sum).unwrap(), vec![0.0]);
    assert_eq!(store.compute("empty", &["amount"], Aggregate::Count).unwrap(), vec![0.0]);
    for op in [Aggregate::Mean, Aggregate::Max, Aggregate::Min] {
        assert!(matches!(
            store.compute("empty", &["amount"], op),
            Err(EngineError::EmptyAggregate { .. })
        ));
    }
}

#[test]
fn test_join_row_counts_are_monotone() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();
    store.load(DataSource::file("data/sales.csv"), "sales").unwrap();
    store.load_from_table("products", "products").unwrap();

    let mut counts = Vec::new();
    for how in [JoinType::Inner, JoinType::Left, JoinType::Outer] {
        let name = store
            .join("sales", "products", "product_id", "product_id", how, None)
            .unwrap();
        counts.push(store.get(&name).unwrap().row_count());
    }
    assert_eq!(counts, vec![2, 3, 4]);
}

#[test]
fn test_ledger_size_law() {
    let harness = TestHarness::with_sample_data();
    let mut ledger = harness.ledger();

    ledger.import("data/sales.csv").unwrap();
    assert_eq!(ledger.len(), 1);
    ledger.import("data/sales.csv").unwrap();
    assert_eq!(ledger.len(), 2);
    for i in 0..3 {
        ledger.update_cell(i, 2, "0").unwrap();
        assert_eq!(ledger.len(), 2);
    }
}

#[test]
fn test_old_snapshot_is_unchanged_by_update() {
    let harness = TestHarness::with_sample_data();
    let mut ledger = harness.ledger();

    let before = ledger.import("data/sales.csv").unwrap();
    let frozen = (*before).clone();
    let after = ledger.update_cell(0, 2, "2000").unwrap();

    assert_eq!(*before, frozen);
    assert_eq!(after.id(), before.id());
    assert_ne!(after.timestamp(), before.timestamp());
}

#[test]
fn test_update_export_reimport_round_trip() {
    let harness = TestHarness::with_sample_data();
    let mut ledger = harness.ledger();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("updated_sales.csv");

    ledger.import("data/sales.csv").unwrap();
    let updated = ledger.update_cell(0, 2, "2000").unwrap();
    ledger.export(&updated, &path).unwrap();

    let reread = harness
        .codec
        .read(&path, &ReadOptions { format: None, infer_types: false })
        .unwrap();
    assert_eq!(reread.headers(), updated.headers());
    assert_eq!(reread.rows(), updated.data());
    assert_eq!(reread.rows()[0][2], CellValue::from("2000"));

    let reimported = ledger.import(&path).unwrap();
    assert_eq!(reimported.data(), updated.data());
}
