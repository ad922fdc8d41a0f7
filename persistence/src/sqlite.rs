//! FILENAME: persistence/src/sqlite.rs
//! PURPOSE: SQLite-backed `QueryExecutor`.
//! CONTEXT: Holds only the database path. Every call opens its own
//! connection and drops it before returning, on success and on error.

use crate::error::{PersistenceError, PersistenceResult};
use kpi_engine::logging::{self, log_debug, log_info};
use kpi_engine::{BoxError, CellValue, IfExists, QueryExecutor, Row, Table};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteConnector { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> PersistenceResult<Connection> {
        log_debug!(logging::SQL, "open {}", self.path.display());
        Ok(Connection::open(&self.path)?)
    }

    /// Runs a query and collects every row.
    pub fn query(&self, sql: &str) -> PersistenceResult<Table> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql)?;
        let headers: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = headers.len();

        let mut rows: Vec<Row> = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(from_sql(row.get_ref(i)?));
            }
            rows.push(cells);
        }

        log_info!(logging::SQL, "query returned {} row(s)", rows.len());
        Ok(Table::new(headers, rows)?)
    }

    /// Writes a table, creating it when absent.
    pub fn store(&self, table: &Table, table_name: &str, if_exists: IfExists) -> PersistenceResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let ident = quote_identifier(table_name);

        let exists = tx
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table_name],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        match (exists, if_exists) {
            (true, IfExists::Fail) => return Err(PersistenceError::TableExists(table_name.to_string())),
            (true, IfExists::Replace) => {
                tx.execute(&format!("DROP TABLE {}", ident), [])?;
                create_table(&tx, &ident, table)?;
            }
            (true, IfExists::Append) => {}
            (false, _) => create_table(&tx, &ident, table)?,
        }

        let columns: Vec<String> = table.headers().iter().map(|h| quote_identifier(h)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            ident,
            columns.join(", "),
            placeholders.join(", ")
        );
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter().map(to_sql)))?;
            }
        }
        tx.commit()?;

        log_info!(
            logging::SQL,
            "wrote {} row(s) to {} ({:?})",
            table.row_count(),
            table_name,
            if_exists
        );
        Ok(())
    }
}

impl QueryExecutor for SqliteConnector {
    fn execute(&self, query: &str) -> Result<Table, BoxError> {
        Ok(self.query(query)?)
    }

    fn write_table(&self, table: &Table, table_name: &str, if_exists: IfExists) -> Result<(), BoxError> {
        Ok(self.store(table, table_name, if_exists)?)
    }

    fn connection_label(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Declared type per column: REAL for numbers, INTEGER for booleans, TEXT otherwise.
fn create_table(conn: &Connection, ident: &str, table: &Table) -> PersistenceResult<()> {
    let definitions: Vec<String> = table
        .headers()
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let mut kind = None;
            for row in table.rows() {
                let this = match &row[c] {
                    CellValue::Null => continue,
                    CellValue::Number(_) => "REAL",
                    CellValue::Boolean(_) => "INTEGER",
                    CellValue::Text(_) => "TEXT",
                };
                kind = match kind {
                    None => Some(this),
                    Some(k) if k == this => Some(k),
                    Some(_) => Some("TEXT"),
                };
            }
            format!("{} {}", quote_identifier(name), kind.unwrap_or("TEXT"))
        })
        .collect();

    conn.execute(&format!("CREATE TABLE {} ({})", ident, definitions.join(", ")), [])?;
    Ok(())
}

fn to_sql(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Number(n) => Value::Real(*n),
        CellValue::Boolean(b) => Value::Integer(*b as i64),
        CellValue::Text(s) => Value::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Number(i as f64),
        ValueRef::Real(f) => CellValue::Number(f),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}
