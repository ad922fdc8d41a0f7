//! FILENAME: engine/src/store.rs
//! PURPOSE: TableStore, the name-addressed facade over in-memory datasets.
//! CONTEXT: Datasets live in a name --> Table map. Loading under an existing
//! name replaces the old table and no history is kept. Every mutating call
//! computes its result first and only then touches the map, so a failure
//! leaves the store exactly as it was.

use crate::aggregate::{aggregate_columns, Aggregate};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::evaluator::{calculate_expression, evaluate_expression, ColumnOperation};
use crate::io::{ExportOptions, FileFormat, IfExists, QueryExecutor, ReadOptions, TableCodec};
use crate::join::{JoinEngine, JoinKeys, JoinType};
use crate::logging::{self, log_enter, log_exit, log_info, log_warn};
use crate::summary::DatasetSummary;
use crate::table::Table;
use crate::value::CellValue;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

// ============================================================================
// DATA SOURCE
// ============================================================================

/// Where `TableStore::load` gets its rows from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// A file read through the codec. Format None means guess from extension.
    File {
        path: PathBuf,
        format: Option<FileFormat>,
    },
    /// A SQL query run through the executor.
    Query(String),
    /// An already-built table.
    Table(Table),
}

impl DataSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        DataSource::File {
            path: path.into(),
            format: None,
        }
    }

    pub fn file_as(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        DataSource::File {
            path: path.into(),
            format: Some(format),
        }
    }

    pub fn query(sql: impl Into<String>) -> Self {
        DataSource::Query(sql.into())
    }
}

impl From<Table> for DataSource {
    fn from(table: Table) -> Self {
        DataSource::Table(table)
    }
}

/// Creates the parent directory of `path` if it has one.
pub(crate) fn ensure_parent_dir(path: &Path) -> EngineResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| {
                log_warn!(logging::STORE, "cannot create '{}': {}", parent.display(), e);
                EngineError::export(path, e)
            })
        }
        _ => Ok(()),
    }
}

/// Double-quotes a SQL identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// TABLE STORE
// ============================================================================

pub struct TableStore {
    datasets: FxHashMap<String, Table>,
    codec: Box<dyn TableCodec>,
    executor: Option<Box<dyn QueryExecutor>>,
    config: EngineConfig,
}

impl TableStore {
    pub fn new(codec: Box<dyn TableCodec>) -> Self {
        TableStore {
            datasets: FxHashMap::default(),
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

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Loads a dataset under `name`, replacing any dataset already there.
    pub fn load(&mut self, source: impl Into<DataSource>, name: &str) -> EngineResult<&Table> {
        let source = source.into();
        log_enter!(logging::STORE, "load", "name={}", name);

        let table = self.read_source(source, name).map_err(|e| {
            log_warn!(logging::STORE, "load of '{}' failed: {}", name, e);
            e
        })?;

        if self.datasets.contains_key(name) {
            log_info!(logging::STORE, "replacing dataset '{}'", name);
        }
        log_exit!(
            logging::STORE,
            "load",
            "name={} rows={} cols={}",
            name,
            table.row_count(),
            table.column_count()
        );
        self.datasets.insert(name.to_string(), table);
        self.get(name)
    }

    fn read_source(&self, source: DataSource, name: &str) -> EngineResult<Table> {
        let table = match source {
            DataSource::File { path, format } => {
                let options = ReadOptions {
                    format,
                    infer_types: self.config.infer_types_on_load,
                };
                self.codec.read(&path, &options).map_err(|e| {
                    EngineError::load(name, format!("cannot read '{}'", path.display()), Some(e))
                })?
            }
            DataSource::Query(sql) => {
                let executor = self.executor.as_ref().ok_or_else(|| {
                    EngineError::load(name, "no database connection configured", None)
                })?;
                executor
                    .execute(&sql)
                    .map_err(|e| EngineError::load(name, format!("query failed: {}", sql), Some(e)))?
            }
            DataSource::Table(table) => table,
        };

        if table.column_count() == 0 {
            return Err(EngineError::load(name, "source has no columns", None));
        }
        Ok(table)
    }

    /// Loads every row of a database table.
    pub fn load_from_table(&mut self, table_name: &str, name: &str) -> EngineResult<&Table> {
        let sql = format!("SELECT * FROM {}", quote_identifier(table_name));
        self.load(DataSource::Query(sql), name)
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub fn get(&self, name: &str) -> EngineResult<&Table> {
        self.datasets.get(name).ok_or_else(|| {
            log_warn!(logging::STORE, "dataset '{}' not found", name);
            EngineError::DatasetNotFound(name.to_string())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Dataset names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn remove(&mut self, name: &str) -> Option<Table> {
        let removed = self.datasets.remove(name);
        if removed.is_some() {
            log_info!(logging::STORE, "removed dataset '{}'", name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    // ------------------------------------------------------------------------
    // Derived columns & aggregates
    // ------------------------------------------------------------------------

    /// Evaluates `expression` for every row and stores it as `new_column`.
    /// An existing column of that name is overwritten in place.
    pub fn add_column(&mut self, name: &str, new_column: &str, expression: &str) -> EngineResult<()> {
        log_enter!(logging::STORE, "add_column", "name={} column={} expr={}", name, new_column, expression);
        let values = evaluate_expression(self.get(name)?, expression).map_err(|e| {
            log_warn!(logging::STORE, "add_column on '{}' failed: {}", name, e);
            e
        })?;
        self.set_column(name, new_column, values)?;
        log_exit!(logging::STORE, "add_column");
        Ok(())
    }

    /// Descriptor form of `add_column`: `source <op> target` stored as `new_column`.
    pub fn add_column_with(
        &mut self,
        name: &str,
        new_column: &str,
        operation: &ColumnOperation,
    ) -> EngineResult<()> {
        log_enter!(logging::STORE, "add_column_with", "name={} column={} op={:?}", name, new_column, operation);
        let values = calculate_expression(self.get(name)?, operation).map_err(|e| {
            log_warn!(logging::STORE, "add_column_with on '{}' failed: {}", name, e);
            e
        })?;
        self.set_column(name, new_column, values)?;
        log_exit!(logging::STORE, "add_column_with");
        Ok(())
    }

    fn set_column(&mut self, name: &str, column: &str, values: Vec<CellValue>) -> EngineResult<()> {
        let table = self
            .datasets
            .get_mut(name)
            .ok_or_else(|| EngineError::DatasetNotFound(name.to_string()))?;
        if table.column_index(column).is_some() {
            log_info!(logging::STORE, "overwriting column '{}' in '{}'", column, name);
        }
        table.set_column(column, values)
    }

    /// One scalar per requested column, in the order given.
    pub fn compute<S: AsRef<str>>(
        &self,
        name: &str,
        columns: &[S],
        operation: Aggregate,
    ) -> EngineResult<Vec<f64>> {
        log_enter!(logging::STORE, "compute", "name={} op={}", name, operation);
        let results = aggregate_columns(self.get(name)?, name, columns, operation).map_err(|e| {
            log_warn!(logging::STORE, "{} over '{}' failed: {}", operation, name, e);
            e
        })?;
        log_exit!(logging::STORE, "compute", "results={:?}", results);
        Ok(results)
    }

    // ------------------------------------------------------------------------
    // Join
    // ------------------------------------------------------------------------

    /// Joins two stored datasets and stores the result under `result_name`
    /// (default `"{left}_{right}_joined"`). Returns the name used.
    pub fn join(
        &mut self,
        left: &str,
        right: &str,
        left_on: impl Into<JoinKeys>,
        right_on: impl Into<JoinKeys>,
        how: JoinType,
        result_name: Option<&str>,
    ) -> EngineResult<String> {
        let result_name = result_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_{}_joined", left, right));
        log_enter!(logging::STORE, "join", "{} + {} -> {}", left, right, result_name);

        let (suffix_left, suffix_right) = &self.config.join_suffixes;
        let joined = JoinEngine::new()
            .with_suffixes(suffix_left, suffix_right)
            .with_names(left, right)
            .join(self.get(left)?, self.get(right)?, &left_on.into(), &right_on.into(), how)
            .map_err(|e| {
                log_warn!(logging::STORE, "join {} + {} failed: {}", left, right, e);
                e
            })?;

        self.datasets.insert(result_name.clone(), joined);
        log_exit!(logging::STORE, "join", "stored '{}'", result_name);
        Ok(result_name)
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    /// Writes a dataset through the codec. `options` None uses the configured
    /// export options.
    pub fn export(
        &self,
        name: &str,
        path: impl AsRef<Path>,
        format: FileFormat,
        options: Option<&ExportOptions>,
    ) -> EngineResult<()> {
        let path = path.as_ref();
        log_enter!(logging::STORE, "export", "name={} path={} format={}", name, path.display(), format);
        let table = self.get(name)?;
        ensure_parent_dir(path)?;
        self.codec
            .write(table, path, format, options.unwrap_or(&self.config.export))
            .map_err(|e| {
                log_warn!(logging::STORE, "export of '{}' failed: {}", name, e);
                EngineError::export(path, e)
            })?;
        log_exit!(logging::STORE, "export");
        Ok(())
    }

    pub fn summary(&self, name: &str) -> EngineResult<DatasetSummary> {
        Ok(DatasetSummary::describe(name, self.get(name)?))
    }

    /// Writes the dataset summary as pretty-printed JSON and returns it.
    pub fn export_summary(&self, name: &str, path: impl AsRef<Path>) -> EngineResult<DatasetSummary> {
        let path = path.as_ref();
        log_enter!(logging::STORE, "export_summary", "name={} path={}", name, path.display());
        let summary = self.summary(name)?;
        let json = summary.to_json_pretty().map_err(|e| EngineError::export(path, e))?;
        ensure_parent_dir(path)?;
        std::fs::write(path, json).map_err(|e| {
            log_warn!(logging::STORE, "summary of '{}' not written: {}", name, e);
            EngineError::export(path, e)
        })?;
        log_exit!(logging::STORE, "export_summary");
        Ok(summary)
    }

    /// Writes a dataset to a database table through the executor.
    pub fn save_to_database(&self, name: &str, table_name: &str, if_exists: IfExists) -> EngineResult<()> {
        log_enter!(logging::STORE, "save_to_database", "name={} table={} if_exists={:?}", name, table_name, if_exists);
        let table = self.get(name)?;
        let executor = self.executor.as_ref().ok_or_else(|| {
            log_warn!(logging::STORE, "save_to_database without a database connection");
            EngineError::UnsupportedOperation("no database connection configured".to_string())
        })?;
        executor
            .write_table(table, table_name, if_exists)
            .map_err(|source| {
                log_warn!(logging::STORE, "saving '{}' to table '{}' failed: {}", name, table_name, source);
                EngineError::Export {
                    path: format!("{}:{}", executor.connection_label(), table_name),
                    source,
                }
            })?;
        log_exit!(logging::STORE, "save_to_database");
        Ok(())
    }
}
