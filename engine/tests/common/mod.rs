//! FILENAME: tests/common/mod.rs
//! Test harness and in-memory collaborators for engine integration tests.

#![allow(dead_code)]

use kpi_engine::{
    BoxError, CellValue, ExportOptions, FileFormat, HistoryLedger, IfExists, QueryExecutor,
    ReadOptions, Table, TableCodec, TableStore,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A written file: the table plus how it was written.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub table: Table,
    pub format: FileFormat,
    pub options: ExportOptions,
}

/// Codec backed by a shared path --> table map. Writes store every cell as
/// text, like a delimited file would, and reads re-infer types on request.
#[derive(Clone, Default)]
pub struct MemoryCodec {
    pub files: Rc<RefCell<FxHashMap<PathBuf, StoredFile>>>,
}

impl MemoryCodec {
    pub fn put(&self, path: &str, table: Table) {
        let stored = StoredFile {
            table: as_text(&table),
            format: FileFormat::from_path(Path::new(path)),
            options: ExportOptions::default(),
        };
        self.files.borrow_mut().insert(PathBuf::from(path), stored);
    }

    pub fn get(&self, path: &Path) -> Option<StoredFile> {
        self.files.borrow().get(path).cloned()
    }
}

fn as_text(table: &Table) -> Table {
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    CellValue::Null => CellValue::Null,
                    other => CellValue::Text(other.display_value()),
                })
                .collect()
        })
        .collect();
    Table::new(table.headers().to_vec(), rows).expect("same shape")
}

fn inferred(table: &Table) -> Table {
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    CellValue::Text(s) => CellValue::infer(s),
                    other => other.clone(),
                })
                .collect()
        })
        .collect();
    Table::new(table.headers().to_vec(), rows).expect("same shape")
}

impl TableCodec for MemoryCodec {
    fn read(&self, path: &Path, options: &ReadOptions) -> Result<Table, BoxError> {
        let file = self
            .get(path)
            .ok_or_else(|| format!("file not found: {}", path.display()))?;
        Ok(if options.infer_types {
            inferred(&file.table)
        } else {
            file.table
        })
    }

    fn write(
        &self,
        table: &Table,
        path: &Path,
        format: FileFormat,
        options: &ExportOptions,
    ) -> Result<(), BoxError> {
        let stored = StoredFile {
            table: as_text(table),
            format,
            options: options.clone(),
        };
        self.files.borrow_mut().insert(path.to_path_buf(), stored);
        Ok(())
    }
}

/// Executor over named in-memory tables. Understands `SELECT * FROM "name"`.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    pub tables: Rc<RefCell<FxHashMap<String, Table>>>,
}

impl MemoryDatabase {
    pub fn put(&self, name: &str, table: Table) {
        self.tables.borrow_mut().insert(name.to_string(), table);
    }
}

impl QueryExecutor for MemoryDatabase {
    fn execute(&self, query: &str) -> Result<Table, BoxError> {
        let name = query
            .trim()
            .strip_prefix("SELECT * FROM ")
            .map(|rest| rest.trim().trim_matches('"'))
            .ok_or_else(|| format!("unsupported query: {}", query))?;
        self.tables
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| format!("no such table: {}", name).into())
    }

    fn write_table(&self, table: &Table, table_name: &str, if_exists: IfExists) -> Result<(), BoxError> {
        let mut tables = self.tables.borrow_mut();
        match (tables.get(table_name), if_exists) {
            (Some(_), IfExists::Fail) => Err(format!("table '{}' already exists", table_name).into()),
            (Some(existing), IfExists::Append) => {
                let mut rows = existing.rows().to_vec();
                rows.extend(table.rows().iter().cloned());
                let merged = Table::new(existing.headers().to_vec(), rows)?;
                tables.insert(table_name.to_string(), merged);
                Ok(())
            }
            _ => {
                tables.insert(table_name.to_string(), table.clone());
                Ok(())
            }
        }
    }

    fn connection_label(&self) -> String {
        "memory://test".to_string()
    }
}

/// Test harness wiring a store and a ledger to shared in-memory collaborators.
pub struct TestHarness {
    pub codec: MemoryCodec,
    pub database: MemoryDatabase,
}

impl TestHarness {
    pub fn new() -> Self {
        TestHarness {
            codec: MemoryCodec::default(),
            database: MemoryDatabase::default(),
        }
    }

    /// Harness with `data/sales.csv` on "disk" and a `products` database table.
    pub fn with_sample_data() -> Self {
        let harness = Self::new();
        harness.codec.put("data/sales.csv", sales_table());
        harness.database.put("products", products_table());
        harness
    }

    pub fn store(&self) -> TableStore {
        TableStore::new(Box::new(self.codec.clone())).with_executor(Box::new(self.database.clone()))
    }

    pub fn ledger(&self) -> HistoryLedger {
        HistoryLedger::new(Box::new(self.codec.clone())).with_executor(Box::new(self.database.clone()))
    }
}

pub fn sales_table() -> Table {
    Table::from_rows(
        &["date", "product_id", "sales_amount"],
        vec![
            vec![CellValue::from("2023-01-01"), "P001".into(), 1000.0.into()],
            vec![CellValue::from("2023-02-01"), "P002".into(), 1200.0.into()],
            vec![CellValue::from("2023-03-01"), "P001".into(), 1500.0.into()],
        ],
    )
    .expect("valid sales table")
}

pub fn products_table() -> Table {
    Table::from_rows(
        &["product_id", "name", "sales_amount"],
        vec![
            vec![CellValue::from("P001"), "Widget".into(), 10.0.into()],
            vec![CellValue::from("P003"), "Gizmo".into(), 30.0.into()],
        ],
    )
    .expect("valid products table")
}
