//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the KPI table engine.
//! CONTEXT: Two facades over the same tabular data: `TableStore` addresses
//! datasets by name, `HistoryLedger` addresses immutable snapshots by id.
//! File and database access go through the `TableCodec` and
//! `QueryExecutor` traits, implemented in `kpi-persistence`.

pub mod logging;

pub mod aggregate;
pub mod analytics;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod io;
pub mod join;
pub mod store;
pub mod summary;
pub mod table;
pub mod value;

// Re-export commonly used types at the crate root
pub use aggregate::{aggregate_column, aggregate_columns, Aggregate};
pub use analytics::{moving_average, percentile, year_over_year_growth};
pub use config::EngineConfig;
pub use error::{BoxError, EngineError, EngineResult};
pub use evaluator::{calculate_expression, evaluate_expression, ArithmeticOperation, ColumnOperation, Evaluator};
pub use history::{DataItem, HistoryLedger, ItemKind, ItemSource};
pub use io::{
    CsvOptions, ExcelOptions, ExportOptions, FileFormat, IfExists, JsonOptions, JsonOrient,
    QueryExecutor, ReadOptions, TableCodec,
};
pub use join::{join_tables, JoinEngine, JoinKeys, JoinType};
pub use store::{DataSource, TableStore};
pub use summary::{ColumnMap, DatasetSummary, NumericStats};
pub use table::{Row, Table};
pub use value::{format_number, CellValue};
