//! FILENAME: tests/test_store.rs
//! Integration tests for TableStore against in-memory collaborators.

mod common;

use common::{products_table, TestHarness};
use kpi_engine::{
    Aggregate, ArithmeticOperation, CellValue, ColumnOperation, DataSource, EngineError,
    ExportOptions, FileFormat, IfExists, JoinType, JsonOrient, Table,
};

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_load_file_infers_types() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();

    let table = store.load(DataSource::file("data/sales.csv"), "sales").unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.rows()[0][2], CellValue::Number(1000.0));
}

#[test]
fn test_load_by_query_and_by_table_name() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();

    store
        .load(DataSource::query("SELECT * FROM products"), "p1")
        .unwrap();
    store.load_from_table("products", "p2").unwrap();
    assert_eq!(store.get("p1").unwrap(), store.get("p2").unwrap());
    assert_eq!(store.get("p2").unwrap(), &products_table());
}

#[test]
fn test_failed_query_is_a_load_error() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();

    let err = store.load_from_table("nope", "n").unwrap_err();
    assert!(matches!(err, EngineError::Load { .. }));
    assert!(std::error::Error::source(&err).is_some());
    assert!(store.is_empty());
}

// ============================================================================
// DERIVED COLUMNS & COMPUTE
// ============================================================================

#[test]
fn test_descriptor_and_expression_agree() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();
    let amounts = Table::from_rows(&["a", "b"], vec![vec![10.0, 4.0], vec![9.0, 0.0]]).unwrap();
    store.load(amounts, "t").unwrap();

    store.add_column("t", "by_expr", "a / b").unwrap();
    let op = ColumnOperation::new(ArithmeticOperation::Divide, "a", "b");
    store.add_column_with("t", "by_desc", &op).unwrap();

    let table = store.get("t").unwrap();
    let expr: Vec<_> = table.column("by_expr").unwrap().cloned().collect();
    let desc: Vec<_> = table.column("by_desc").unwrap().cloned().collect();
    assert_eq!(expr, desc);
    assert_eq!(expr[0], CellValue::Number(2.5));
    assert_eq!(expr[1], CellValue::Number(f64::INFINITY));
}

#[test]
fn test_compute_returns_one_value_per_column_in_order() {
    let harness = TestHarness::new();
    let mut store = harness.store();
    let t = Table::from_rows(&["x", "y"], vec![vec![1.0, 10.0], vec![3.0, 30.0]]).unwrap();
    store.load(t, "t").unwrap();

    assert_eq!(store.compute("t", &["y", "x"], Aggregate::Max).unwrap(), vec![30.0, 3.0]);
    assert_eq!(store.compute("t", &["x"], Aggregate::Mean).unwrap(), vec![2.0]);
}

#[test]
fn test_zero_over_zero_rows_are_missing() {
    let harness = TestHarness::new();
    let mut store = harness.store();
    let t = Table::from_rows(&["a", "b"], vec![vec![0.0, 0.0], vec![1.0, 1.0]]).unwrap();
    store.load(t, "t").unwrap();
    store.add_column("t", "r", "a / b").unwrap();

    assert_eq!(store.compute("t", &["r"], Aggregate::Count).unwrap(), vec![1.0]);
    assert_eq!(store.compute("t", &["r"], Aggregate::Mean).unwrap(), vec![1.0]);
    let summary = store.summary("t").unwrap();
    assert_eq!(summary.missing_values.get("r"), Some(&1));
}

#[test]
fn test_compute_rejects_text_except_for_count() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();
    store.load(DataSource::file("data/sales.csv"), "sales").unwrap();

    let err = store.compute("sales", &["product_id"], Aggregate::Sum).unwrap_err();
    assert!(matches!(err, EngineError::NonNumeric { row: 0, .. }));
    assert_eq!(err.status_code(), 400);
    assert_eq!(store.compute("sales", &["product_id"], Aggregate::Count).unwrap(), vec![3.0]);
}

#[test]
fn test_compute_unknown_column() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();
    store.load(DataSource::file("data/sales.csv"), "sales").unwrap();

    assert!(matches!(
        store.compute("sales", &["profit"], Aggregate::Sum),
        Err(EngineError::UnknownColumn { .. })
    ));
}

// ============================================================================
// JOIN & EXPORT
// ============================================================================

#[test]
fn test_join_suffixes_colliding_columns() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();
    store.load(DataSource::file("data/sales.csv"), "sales").unwrap();
    store.load_from_table("products", "products").unwrap();

    let name = store
        .join("sales", "products", "product_id", "product_id", JoinType::Left, Some("report"))
        .unwrap();
    let report = store.get(&name).unwrap();
    assert_eq!(
        report.headers(),
        ["date", "product_id", "sales_amount_x", "name", "sales_amount_y"]
    );
    assert_eq!(report.row_count(), 3);
    assert_eq!(report.rows()[1][3], CellValue::Null);
}

#[test]
fn test_export_passes_format_and_options_to_codec() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();
    store.load(DataSource::file("data/sales.csv"), "sales").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/sales.json");
    let mut options = ExportOptions::default();
    options.json.orient = JsonOrient::Records;
    store
        .export("sales", &path, FileFormat::Json, Some(&options))
        .unwrap();

    assert!(dir.path().join("out").is_dir());
    let written = harness.codec.get(&path).unwrap();
    assert_eq!(written.format, FileFormat::Json);
    assert_eq!(written.options.json.orient, JsonOrient::Records);
    assert_eq!(written.table.row_count(), 3);
}

#[test]
fn test_unknown_format_name_is_rejected() {
    assert!(matches!(
        "xml".parse::<FileFormat>(),
        Err(EngineError::UnsupportedFormat(_))
    ));
}

#[test]
fn test_save_to_database_respects_if_exists() {
    let harness = TestHarness::with_sample_data();
    let mut store = harness.store();
    store.load(DataSource::file("data/sales.csv"), "sales").unwrap();

    store.save_to_database("sales", "sales_db", IfExists::Fail).unwrap();
    let err = store
        .save_to_database("sales", "sales_db", IfExists::Fail)
        .unwrap_err();
    assert!(matches!(err, EngineError::Export { .. }));

    store.save_to_database("sales", "sales_db", IfExists::Append).unwrap();
    assert_eq!(harness.database.tables.borrow()["sales_db"].row_count(), 6);

    store.save_to_database("sales", "sales_db", IfExists::Replace).unwrap();
    assert_eq!(harness.database.tables.borrow()["sales_db"].row_count(), 3);
}
