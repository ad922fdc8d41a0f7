//! FILENAME: engine/src/aggregate.rs
//! PURPOSE: Column reductions: sum, mean, max, min, count.
//! CONTEXT: Used by `TableStore::compute` and by dataset summaries. Nulls and
//! NaN numbers are skipped by every reduction. Other cells must coerce to a
//! number for sum/mean/max/min; count accepts any non-missing cell.

use crate::error::{EngineError, EngineResult};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// AGGREGATE KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Mean,
    Max,
    Min,
    Count,
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Max => "max",
            Aggregate::Min => "min",
            Aggregate::Count => "count",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregate {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregate::Sum),
            "mean" | "avg" | "average" => Ok(Aggregate::Mean),
            "max" => Ok(Aggregate::Max),
            "min" => Ok(Aggregate::Min),
            "count" => Ok(Aggregate::Count),
            _ => Err(EngineError::UnsupportedOperation(s.to_string())),
        }
    }
}

// ============================================================================
// ACCUMULATOR
// ============================================================================

/// Accumulator for computing aggregates incrementally.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    pub sum: f64,
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Running mean and sum of squared differences (Welford's algorithm).
    pub mean: f64,
    pub m2: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));

        let delta = value - self.mean;
        self.mean += delta / (self.count as f64);
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Final value, or None when the reduction is undefined on zero inputs.
    pub fn compute(&self, aggregate: Aggregate) -> Option<f64> {
        match aggregate {
            Aggregate::Sum => Some(self.sum),
            Aggregate::Count => Some(self.count as f64),
            Aggregate::Mean => (self.count > 0).then(|| self.sum / self.count as f64),
            Aggregate::Min => self.min,
            Aggregate::Max => self.max,
        }
    }

    /// Sample standard deviation (n - 1 denominator); None below two values.
    pub fn std_dev(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count - 1) as f64).sqrt())
    }
}

// ============================================================================
// COLUMN REDUCTION
// ============================================================================

/// Reduces one column of `table`. `dataset` is only used in error messages.
pub fn aggregate_column(
    table: &Table,
    dataset: &str,
    column: &str,
    aggregate: Aggregate,
) -> EngineResult<f64> {
    let cells = table.column(column).ok_or_else(|| EngineError::UnknownColumn {
        dataset: dataset.to_string(),
        column: column.to_string(),
    })?;

    let mut acc = Accumulator::new();
    for (row, cell) in cells.enumerate() {
        if cell.is_missing() {
            continue;
        }
        if aggregate == Aggregate::Count {
            acc.count += 1;
            continue;
        }
        match cell.as_number() {
            Some(n) => acc.add(n),
            None => {
                return Err(EngineError::NonNumeric {
                    dataset: dataset.to_string(),
                    column: column.to_string(),
                    row,
                    value: cell.display_value(),
                })
            }
        }
    }

    acc.compute(aggregate).ok_or_else(|| EngineError::EmptyAggregate {
        dataset: dataset.to_string(),
        column: column.to_string(),
        operation: aggregate.to_string(),
    })
}

/// Reduces several columns; results are in the order of `columns`.
pub fn aggregate_columns<S: AsRef<str>>(
    table: &Table,
    dataset: &str,
    columns: &[S],
    aggregate: Aggregate,
) -> EngineResult<Vec<f64>> {
    columns
        .iter()
        .map(|column| aggregate_column(table, dataset, column.as_ref(), aggregate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    fn mixed() -> Table {
        Table::from_rows(
            &["amount", "name"],
            vec![
                vec![CellValue::Number(10.0), "a".into()],
                vec![CellValue::Null, "b".into()],
                vec![CellValue::from("30"), CellValue::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn parses_operation_names() {
        assert_eq!("SUM".parse::<Aggregate>().unwrap(), Aggregate::Sum);
        assert_eq!("avg".parse::<Aggregate>().unwrap(), Aggregate::Mean);
        assert!(matches!(
            "median".parse::<Aggregate>(),
            Err(EngineError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn reductions_skip_nulls() {
        let t = mixed();
        assert_eq!(aggregate_column(&t, "d", "amount", Aggregate::Sum).unwrap(), 40.0);
        assert_eq!(aggregate_column(&t, "d", "amount", Aggregate::Mean).unwrap(), 20.0);
        assert_eq!(aggregate_column(&t, "d", "amount", Aggregate::Max).unwrap(), 30.0);
        assert_eq!(aggregate_column(&t, "d", "amount", Aggregate::Min).unwrap(), 10.0);
        assert_eq!(aggregate_column(&t, "d", "amount", Aggregate::Count).unwrap(), 2.0);
    }

    #[test]
    fn nan_cells_count_as_missing() {
        let t = Table::from_rows(
            &["r"],
            vec![vec![CellValue::Number(f64::NAN)], vec![CellValue::Number(1.0)]],
        )
        .unwrap();
        assert_eq!(aggregate_column(&t, "d", "r", Aggregate::Count).unwrap(), 1.0);
        assert_eq!(aggregate_column(&t, "d", "r", Aggregate::Mean).unwrap(), 1.0);
        assert_eq!(aggregate_column(&t, "d", "r", Aggregate::Max).unwrap(), 1.0);
    }

    #[test]
    fn count_accepts_text_but_sum_does_not() {
        let t = mixed();
        assert_eq!(aggregate_column(&t, "d", "name", Aggregate::Count).unwrap(), 2.0);
        let err = aggregate_column(&t, "d", "name", Aggregate::Sum).unwrap_err();
        assert!(matches!(err, EngineError::NonNumeric { row: 0, .. }));
    }

    #[test]
    fn empty_column_behaviour() {
        let t = Table::empty(vec!["x".into()]).unwrap();
        assert_eq!(aggregate_column(&t, "d", "x", Aggregate::Sum).unwrap(), 0.0);
        assert_eq!(aggregate_column(&t, "d", "x", Aggregate::Count).unwrap(), 0.0);
        for op in [Aggregate::Mean, Aggregate::Max, Aggregate::Min] {
            let err = aggregate_column(&t, "d", "x", op).unwrap_err();
            assert!(matches!(err, EngineError::EmptyAggregate { .. }), "{op}");
        }
    }

    #[test]
    fn results_follow_requested_column_order() {
        let t = Table::from_rows(&["a", "b"], vec![vec![1.0, 10.0], vec![2.0, 20.0]]).unwrap();
        let sums = aggregate_columns(&t, "d", &["b", "a"], Aggregate::Sum).unwrap();
        assert_eq!(sums, vec![30.0, 3.0]);
    }

    #[test]
    fn unknown_column_is_reported() {
        let err = aggregate_column(&mixed(), "d", "nope", Aggregate::Sum).unwrap_err();
        assert!(matches!(err, EngineError::UnknownColumn { .. }));
    }

    #[test]
    fn std_dev_is_sample_based() {
        let mut acc = Accumulator::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(v);
        }
        let sd = acc.std_dev().unwrap();
        assert!((sd - 2.138089935).abs() < 1e-6);
    }
}
