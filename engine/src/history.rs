//! FILENAME: engine/src/history.rs
//! PURPOSE: HistoryLedger, the id-addressed sequence of immutable dataset snapshots.
//! CONTEXT: Each import pushes a new `DataItem` to the front and makes it
//! current. A cell update never mutates an item: it deep-copies the current
//! rows, builds a replacement with the same id, and swaps it into the same
//! slot. Items are handed out as `Arc<DataItem>`, so a caller holding an old
//! snapshot keeps seeing it unchanged.

use crate::config::EngineConfig;
use crate::error::{BoxError, EngineError, EngineResult};
use crate::io::{FileFormat, QueryExecutor, ReadOptions, TableCodec};
use crate::logging::{self, log_enter, log_exit, log_error, log_info, log_warn};
use crate::store::ensure_parent_dir;
use crate::table::{Row, Table};
use crate::value::CellValue;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// DATA ITEM
// ============================================================================

/// Provenance tag of a history item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Csv,
    Excel,
    Json,
    Parquet,
    Database,
}

impl From<FileFormat> for ItemKind {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::Csv => ItemKind::Csv,
            FileFormat::Excel => ItemKind::Excel,
            FileFormat::Json => ItemKind::Json,
            FileFormat::Parquet => ItemKind::Parquet,
        }
    }
}

/// Where an item's rows originally came from. Carried forward across updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemSource {
    File { path: String },
    Database { connection: String, query: String },
}

/// An immutable snapshot of one table plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    id: Uuid,
    name: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    kind: ItemKind,
    headers: Vec<String>,
    data: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<ItemSource>,
}

impl DataItem {
    fn new(name: String, kind: ItemKind, table: Table, source: Option<ItemSource>) -> Self {
        let (headers, data) = table.into_parts();
        DataItem {
            id: Uuid::new_v4(),
            name,
            timestamp: Utc::now(),
            kind,
            headers,
            data,
            source,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn data(&self) -> &[Row] {
        &self.data
    }

    pub fn source(&self) -> Option<&ItemSource> {
        self.source.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Deep copy of the snapshot as a standalone table.
    pub fn to_table(&self) -> EngineResult<Table> {
        Table::new(self.headers.clone(), self.data.clone())
    }
}

// ============================================================================
// LEDGER
// ============================================================================

pub struct HistoryLedger {
    /// Newest import first. Updates replace in place.
    history: Vec<Arc<DataItem>>,
    current: Option<Uuid>,
    codec: Box<dyn TableCodec>,
    executor: Option<Box<dyn QueryExecutor>>,
    config: EngineConfig,
}

impl HistoryLedger {
    pub fn new(codec: Box<dyn TableCodec>) -> Self {
        HistoryLedger {
            history: Vec::new(),
            current: None,
            codec,
            executor: None,
            config: EngineConfig::default(),
        }
    }

    pub fn with_executor(mut self, executor: Box<dyn QueryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    // ------------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------------

    /// Reads a file (format from its extension) into a new current item.
    pub fn import(&mut self, path: impl AsRef<Path>) -> EngineResult<Arc<DataItem>> {
        self.import_file(path.as_ref(), None)
    }

    pub fn import_as(&mut self, path: impl AsRef<Path>, format: FileFormat) -> EngineResult<Arc<DataItem>> {
        self.import_file(path.as_ref(), Some(format))
    }

    fn import_file(&mut self, path: &Path, format: Option<FileFormat>) -> EngineResult<Arc<DataItem>> {
        log_enter!(logging::HISTORY, "import", "path={}", path.display());
        let source_ref = path.display().to_string();
        let options = ReadOptions {
            format,
            infer_types: self.config.infer_types_on_import,
        };

        let table = self
            .codec
            .read(path, &options)
            .and_then(require_columns)
            .map_err(|source| {
                log_warn!(logging::HISTORY, "import of '{}' failed: {}", source_ref, source);
                EngineError::Import {
                    source_ref: source_ref.clone(),
                    source,
                }
            })?;

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("data");
        let name = self.timestamped_name(stem, &source_ref)?;
        let kind: ItemKind = options.resolve_format(path).into();
        let item = DataItem::new(name, kind, table, Some(ItemSource::File { path: source_ref }));
        Ok(self.push(item))
    }

    /// Runs a query through the executor into a new current `database` item.
    pub fn import_query(&mut self, query: &str) -> EngineResult<Arc<DataItem>> {
        log_enter!(logging::HISTORY, "import_query", "query={}", query);
        let executor = self.executor.as_ref().ok_or_else(|| {
            log_warn!(logging::HISTORY, "import_query without a database connection");
            EngineError::Import {
                source_ref: query.to_string(),
                source: "no database connection configured".into(),
            }
        })?;

        let table = executor
            .execute(query)
            .and_then(require_columns)
            .map_err(|source| {
                log_warn!(logging::HISTORY, "query import failed: {}", source);
                EngineError::Import {
                    source_ref: query.to_string(),
                    source,
                }
            })?;

        let source = ItemSource::Database {
            connection: executor.connection_label(),
            query: query.to_string(),
        };
        let name = self.timestamped_name("query", query)?;
        let item = DataItem::new(name, ItemKind::Database, table, Some(source));
        Ok(self.push(item))
    }

    /// Records an already-built table as a new current item.
    pub fn import_table(&mut self, name: &str, kind: ItemKind, table: Table) -> Arc<DataItem> {
        log_enter!(logging::HISTORY, "import_table", "name={}", name);
        self.push(DataItem::new(name.to_string(), kind, table, None))
    }

    fn timestamped_name(&self, stem: &str, source_ref: &str) -> EngineResult<String> {
        let mut name = format!("{}_", stem);
        write!(name, "{}", Utc::now().format(&self.config.import_name_timestamp)).map_err(|_| {
            EngineError::Import {
                source_ref: source_ref.to_string(),
                source: format!(
                    "invalid name timestamp format '{}'",
                    self.config.import_name_timestamp
                )
                .into(),
            }
        })?;
        Ok(name)
    }

    fn push(&mut self, item: DataItem) -> Arc<DataItem> {
        let item = Arc::new(item);
        self.history.insert(0, Arc::clone(&item));
        self.current = Some(item.id);
        log_exit!(
            logging::HISTORY,
            "import",
            "id={} name={} rows={}",
            item.id,
            item.name,
            item.row_count()
        );
        item
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Writes an item through the codec; format from the path's extension.
    pub fn export(&self, item: &DataItem, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();
        log_enter!(logging::HISTORY, "export", "id={} path={}", item.id, path.display());
        let table = item.to_table()?;
        ensure_parent_dir(path)?;
        self.codec
            .write(&table, path, FileFormat::from_path(path), &self.config.export)
            .map_err(|e| {
                log_warn!(logging::HISTORY, "export of {} failed: {}", item.id, e);
                EngineError::export(path, e)
            })?;
        log_exit!(logging::HISTORY, "export");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Copy-on-write update
    // ------------------------------------------------------------------------

    /// Replaces the current item with a copy that differs in exactly one cell.
    pub fn update_cell(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<CellValue>,
    ) -> EngineResult<Arc<DataItem>> {
        let id = self.current.ok_or_else(|| {
            log_warn!(logging::HISTORY, "update_cell with no current item");
            EngineError::NoCurrentData
        })?;
        log_enter!(logging::HISTORY, "update_cell", "id={} row={} col={}", id, row, col);

        let slot = self
            .history
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| {
                log_error!(logging::HISTORY, "current item {} is missing from history", id);
                EngineError::Update {
                    id,
                    message: "current item is missing from history".to_string(),
                }
            })?;
        let old = &self.history[slot];

        let (rows, cols) = (old.row_count(), old.column_count());
        if row >= rows || col >= cols {
            log_warn!(logging::HISTORY, "update ({}, {}) outside {}x{}", row, col, rows, cols);
            return Err(EngineError::IndexOutOfRange { row, col, rows, cols });
        }

        let mut data = old.data.clone();
        data[row][col] = value.into();

        // A replacement always gets a strictly later timestamp
        let timestamp = Utc::now().max(old.timestamp + Duration::microseconds(1));
        let updated = Arc::new(DataItem {
            id,
            name: format!("{}{}", old.name, self.config.updated_suffix),
            timestamp,
            kind: old.kind,
            headers: old.headers.clone(),
            data,
            source: old.source.clone(),
        });

        self.history[slot] = Arc::clone(&updated);
        self.current = Some(id);
        log_exit!(logging::HISTORY, "update_cell", "name={}", updated.name);
        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn get_by_id(&self, id: Uuid) -> Option<Arc<DataItem>> {
        self.history.iter().find(|item| item.id == id).cloned()
    }

    pub fn current(&self) -> Option<Arc<DataItem>> {
        self.current.and_then(|id| self.get_by_id(id))
    }

    /// Makes an earlier item current again, so the next update targets it.
    pub fn select(&mut self, id: Uuid) -> EngineResult<Arc<DataItem>> {
        let item = self.get_by_id(id).ok_or_else(|| {
            log_warn!(logging::HISTORY, "select: item {} not found", id);
            EngineError::ItemNotFound(id)
        })?;
        self.current = Some(id);
        log_info!(logging::HISTORY, "current item is now {} ({})", id, item.name);
        Ok(item)
    }

    pub fn history(&self) -> &[Arc<DataItem>] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        log_info!(logging::HISTORY, "clearing {} item(s)", self.history.len());
        self.history.clear();
        self.current = None;
    }
}

fn require_columns(table: Table) -> Result<Table, BoxError> {
    if table.column_count() == 0 {
        Err("source has no columns".into())
    } else {
        Ok(table)
    }
}
