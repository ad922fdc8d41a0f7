//! FILENAME: engine/src/table.rs
//! PURPOSE: The in-memory dataset: ordered headers plus positionally aligned rows.
//! CONTEXT: Every store entry and history snapshot owns one of these. The
//! constructor enforces the two shape invariants (unique headers, every row
//! exactly as wide as the header list); all mutators preserve them.

use crate::error::{EngineError, EngineResult};
use crate::value::CellValue;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

pub type Row = Vec<CellValue>;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

/// Unchecked wire shape; deserialized tables pass through `Table::new`.
#[derive(Deserialize)]
struct RawTable {
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Row>,
}

impl TryFrom<RawTable> for Table {
    type Error = EngineError;

    fn try_from(raw: RawTable) -> EngineResult<Self> {
        Table::new(raw.headers, raw.rows)
    }
}

impl Table {
    /// Builds a table, rejecting duplicate headers and ragged rows.
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> EngineResult<Self> {
        let mut seen = FxHashSet::default();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(EngineError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    header
                )));
            }
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(EngineError::InvalidTable(format!(
                    "row {} has {} cells, expected {}",
                    idx,
                    row.len(),
                    headers.len()
                )));
            }
        }

        Ok(Table { headers, rows })
    }

    /// Convenience constructor for literal tables in code and tests.
    pub fn from_rows<H, R, V>(headers: &[H], rows: R) -> EngineResult<Self>
    where
        H: AsRef<str>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let headers = headers.iter().map(|h| h.as_ref().to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();
        Table::new(headers, rows)
    }

    /// A table with headers and no rows.
    pub fn empty(headers: Vec<String>) -> EngineResult<Self> {
        Table::new(headers, Vec::new())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.headers, self.rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Iterates the cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &CellValue> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Replaces the column `name` in place, or appends it as the last column
    /// when no column of that name exists. `values` must have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) -> EngineResult<()> {
        if values.len() != self.rows.len() {
            return Err(EngineError::InvalidTable(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Returns a copy with one cell replaced. The receiver is untouched.
    pub fn with_cell(&self, row: usize, col: usize, value: CellValue) -> EngineResult<Table> {
        if row >= self.row_count() || col >= self.column_count() {
            return Err(EngineError::IndexOutOfRange {
                row,
                col,
                rows: self.row_count(),
                cols: self.column_count(),
            });
        }
        let mut copy = self.clone();
        copy.rows[row][col] = value;
        Ok(copy)
    }
}
