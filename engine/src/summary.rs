//! FILENAME: engine/src/summary.rs
//! PURPOSE: Descriptive summary of a dataset (shape, nulls, numeric stats, memory).
//! CONTEXT: Produced by `TableStore::summary` and written to disk by
//! `TableStore::export_summary`. Every numeric leaf is a plain JSON number
//! (or null where a statistic is undefined).

use crate::aggregate::{Accumulator, Aggregate};
use crate::analytics::quantile_sorted;
use crate::table::Table;
use crate::value::CellValue;
use serde::{Serialize, Serializer};

/// Fixed per-table overhead added to the cell footprint estimate.
const TABLE_OVERHEAD_BYTES: usize = 128;

// ============================================================================
// COLUMN MAP
// ============================================================================

/// Column-keyed map that serializes as a JSON object in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap<V>(Vec<(String, V)>);

impl<V> Default for ColumnMap<V> {
    fn default() -> Self {
        ColumnMap(Vec::new())
    }
}

impl<V> ColumnMap<V> {
    pub fn get(&self, column: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn push(&mut self, column: &str, value: V) {
        self.0.push((column.to_string(), value));
    }
}

impl<V: Serialize> Serialize for ColumnMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

// ============================================================================
// SUMMARY DOCUMENT
// ============================================================================

/// count/mean/std/min/quartiles/max of one numeric column, nulls excluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q1: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

impl NumericStats {
    fn from_values(mut values: Vec<f64>) -> Self {
        let mut acc = Accumulator::new();
        for v in &values {
            acc.add(*v);
        }
        values.sort_by(f64::total_cmp);

        let finite = |v: Option<f64>| v.filter(|x| !x.is_nan());
        NumericStats {
            count: values.len(),
            mean: finite(acc.compute(Aggregate::Mean)),
            std: finite(acc.std_dev()),
            min: finite(acc.min),
            q1: finite(quantile_sorted(&values, 0.25)),
            median: finite(quantile_sorted(&values, 0.5)),
            q3: finite(quantile_sorted(&values, 0.75)),
            max: finite(acc.max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub dataset_name: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub missing_values: ColumnMap<usize>,
    pub numeric_summary: ColumnMap<NumericStats>,
    pub memory_usage: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Categorical,
    Other,
}

/// Numeric: every non-null cell is a number. Categorical: holds any text.
/// Boolean-only columns are neither.
fn classify<'a>(cells: impl Iterator<Item = &'a CellValue>) -> ColumnKind {
    let mut kind = ColumnKind::Numeric;
    for cell in cells {
        match cell {
            CellValue::Null | CellValue::Number(_) => {}
            CellValue::Text(_) => return ColumnKind::Categorical,
            CellValue::Boolean(_) => kind = ColumnKind::Other,
        }
    }
    kind
}

impl DatasetSummary {
    pub fn describe(dataset_name: &str, table: &Table) -> Self {
        let mut summary = DatasetSummary {
            dataset_name: dataset_name.to_string(),
            total_rows: table.row_count(),
            total_columns: table.column_count(),
            columns: table.headers().to_vec(),
            numeric_columns: Vec::new(),
            categorical_columns: Vec::new(),
            missing_values: ColumnMap::default(),
            numeric_summary: ColumnMap::default(),
            memory_usage: TABLE_OVERHEAD_BYTES,
        };

        for (col, name) in table.headers().iter().enumerate() {
            let cells = || table.rows().iter().map(move |row| &row[col]);

            summary
                .missing_values
                .push(name, cells().filter(|c| c.is_missing()).count());
            summary.memory_usage += cells().map(CellValue::estimated_size).sum::<usize>();

            match classify(cells()) {
                ColumnKind::Numeric => {
                    summary.numeric_columns.push(name.clone());
                    let values = cells()
                        .filter(|c| !c.is_missing())
                        .filter_map(CellValue::as_number)
                        .collect();
                    summary
                        .numeric_summary
                        .push(name, NumericStats::from_values(values));
                }
                ColumnKind::Categorical => summary.categorical_columns.push(name.clone()),
                ColumnKind::Other => {}
            }
        }

        summary
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
