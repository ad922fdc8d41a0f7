//! FILENAME: persistence/src/lib.rs
//! KPI Persistence Module
//!
//! File codecs (CSV, Excel, JSON, Parquet) and a SQLite query executor that
//! plug into `kpi-engine` through its `TableCodec` and `QueryExecutor` traits.

mod csv_codec;
mod error;
mod json_codec;
mod parquet_codec;
mod sqlite;
mod xlsx_reader;
mod xlsx_writer;

pub use csv_codec::{read_csv, write_csv};
pub use error::{PersistenceError, PersistenceResult};
pub use json_codec::{read_json, write_json};
pub use parquet_codec::{read_parquet, write_parquet};
pub use sqlite::SqliteConnector;
pub use xlsx_reader::read_xlsx;
pub use xlsx_writer::write_xlsx;

use kpi_engine::logging::{self, log_debug};
use kpi_engine::{BoxError, CellValue, ExportOptions, FileFormat, ReadOptions, Table, TableCodec};
use std::path::Path;

// ============================================================================
// CELL CONVERSION
// ============================================================================

/// Cell from a raw text field. Empty fields are Null in both modes.
pub(crate) fn text_cell(raw: &str, infer_types: bool) -> CellValue {
    if infer_types {
        CellValue::infer(raw)
    } else if raw.is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(raw.to_string())
    }
}

/// Cell from a source that already carries types. Untyped reads render
/// every non-null value as text.
pub(crate) fn typed_cell(value: CellValue, infer_types: bool) -> CellValue {
    match value {
        CellValue::Null | CellValue::Text(_) => value,
        other if infer_types => other,
        other => CellValue::Text(other.display_value()),
    }
}

// ============================================================================
// FILE CODEC
// ============================================================================

/// Dispatches reads and writes to the per-format codecs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCodec;

impl FileCodec {
    pub fn new() -> Self {
        FileCodec
    }

    pub fn read_table(&self, path: &Path, options: &ReadOptions) -> PersistenceResult<Table> {
        let format = options.resolve_format(path);
        log_debug!(logging::CODEC, "read {} as {}", path.display(), format);
        match format {
            FileFormat::Csv => read_csv(path, options.infer_types),
            FileFormat::Excel => read_xlsx(path, None, options.infer_types),
            FileFormat::Json => read_json(path, options.infer_types),
            FileFormat::Parquet => read_parquet(path, options.infer_types),
        }
    }

    pub fn write_table(
        &self,
        table: &Table,
        path: &Path,
        format: FileFormat,
        options: &ExportOptions,
    ) -> PersistenceResult<()> {
        log_debug!(
            logging::CODEC,
            "write {} rows to {} as {}",
            table.row_count(),
            path.display(),
            format
        );
        match format {
            FileFormat::Csv => write_csv(table, path, &options.csv),
            FileFormat::Excel => write_xlsx(table, path, &options.excel),
            FileFormat::Json => write_json(table, path, options.json.orient),
            FileFormat::Parquet => write_parquet(table, path),
        }
    }
}

impl TableCodec for FileCodec {
    fn read(&self, path: &Path, options: &ReadOptions) -> Result<Table, BoxError> {
        Ok(self.read_table(path, options)?)
    }

    fn write(
        &self,
        table: &Table,
        path: &Path,
        format: FileFormat,
        options: &ExportOptions,
    ) -> Result<(), BoxError> {
        Ok(self.write_table(table, path, format, options)?)
    }
}
