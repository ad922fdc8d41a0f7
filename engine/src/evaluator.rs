//! FILENAME: engine/src/evaluator.rs
//! PURPOSE: Evaluates column expressions once per table row.
//! CONTEXT: Expression strings are parsed by `kpi_parser` into an AST; this
//! module walks that tree against a row, coercing each referenced cell to a
//! number. Two calling conventions are supported: a free-form expression
//! string (`sales_amount / quantity`) and a structured `ColumnOperation`
//! descriptor. The descriptor is lowered to the same AST, so both forms give
//! identical results for equivalent inputs.
//!
//! NUMERIC POLICY:
//! - Number cells are used as-is, Boolean as 1/0, numeric text is parsed.
//! - Any other text is an `ExpressionType` error (never a silent zero).
//! - A Null operand makes the row's result Null.
//! - Division follows IEEE float semantics: x/0 is +-inf, 0/0 is NaN.

use crate::error::{EngineError, EngineResult};
use crate::logging::{self, log_debug};
use crate::table::Table;
use crate::value::CellValue;
use kpi_parser::{BinaryOperator, Expression, UnaryOperator};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// STRUCTURED DESCRIPTOR
// ============================================================================

/// The four elementary operations accepted by the structured descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithmeticOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOperation {
    pub fn operator(self) -> BinaryOperator {
        match self {
            ArithmeticOperation::Add => BinaryOperator::Add,
            ArithmeticOperation::Subtract => BinaryOperator::Subtract,
            ArithmeticOperation::Multiply => BinaryOperator::Multiply,
            ArithmeticOperation::Divide => BinaryOperator::Divide,
        }
    }
}

impl FromStr for ArithmeticOperation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(ArithmeticOperation::Add),
            "subtract" => Ok(ArithmeticOperation::Subtract),
            "multiply" => Ok(ArithmeticOperation::Multiply),
            "divide" => Ok(ArithmeticOperation::Divide),
            _ => Err(EngineError::UnsupportedOperation(s.to_string())),
        }
    }
}

/// `{operation, sourceColumn, targetColumn}`: computes `source op target` per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOperation {
    pub operation: ArithmeticOperation,
    pub source_column: String,
    pub target_column: String,
}

impl ColumnOperation {
    pub fn new(
        operation: ArithmeticOperation,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        ColumnOperation {
            operation,
            source_column: source_column.into(),
            target_column: target_column.into(),
        }
    }

    /// Builds a descriptor from an operation name, rejecting unknown names.
    pub fn parse(
        operation: &str,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> EngineResult<Self> {
        Ok(ColumnOperation::new(
            operation.parse()?,
            source_column,
            target_column,
        ))
    }

    pub fn to_expression(&self) -> Expression {
        Expression::column_op(
            self.source_column.clone(),
            self.operation.operator(),
            self.target_column.clone(),
        )
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

/// Parses `expression` and evaluates it for every row of `table`.
pub fn evaluate_expression(table: &Table, expression: &str) -> EngineResult<Vec<CellValue>> {
    let tree = kpi_parser::parse(expression).map_err(|source| EngineError::Parse {
        expression: expression.to_string(),
        source,
    })?;
    Evaluator::new(table, &tree, expression)?.evaluate_all()
}

/// Evaluates a structured descriptor for every row of `table`.
pub fn calculate_expression(table: &Table, operation: &ColumnOperation) -> EngineResult<Vec<CellValue>> {
    let tree = operation.to_expression();
    let text = tree.to_string();
    Evaluator::new(table, &tree, &text)?.evaluate_all()
}

/// Evaluates one parsed expression over the rows of one table.
/// Column references are resolved to indices once, at construction.
pub struct Evaluator<'a> {
    table: &'a Table,
    tree: &'a Expression,
    text: &'a str,
    columns: FxHashMap<&'a str, usize>,
}

impl<'a> Evaluator<'a> {
    /// Fails with `ExpressionColumn` if the tree references a missing column.
    pub fn new(table: &'a Table, tree: &'a Expression, text: &'a str) -> EngineResult<Self> {
        let mut columns = FxHashMap::default();
        for name in tree.columns() {
            let idx = table
                .column_index(name)
                .ok_or_else(|| EngineError::ExpressionColumn {
                    expression: text.to_string(),
                    column: name.to_string(),
                })?;
            columns.insert(name, idx);
        }
        Ok(Evaluator {
            table,
            tree,
            text,
            columns,
        })
    }

    pub fn evaluate_all(&self) -> EngineResult<Vec<CellValue>> {
        log_debug!(
            logging::EVAL,
            "expr={} rows={}",
            self.text,
            self.table.row_count()
        );
        (0..self.table.row_count())
            .map(|row| {
                self.evaluate_row(row)
                    .map(|n| n.map_or(CellValue::Null, CellValue::Number))
            })
            .collect()
    }

    /// Evaluates the tree for one row. `Ok(None)` means a Null operand was hit.
    pub fn evaluate_row(&self, row: usize) -> EngineResult<Option<f64>> {
        self.eval(self.tree, row)
    }

    fn eval(&self, expr: &Expression, row: usize) -> EngineResult<Option<f64>> {
        match expr {
            Expression::Number(n) => Ok(Some(*n)),
            Expression::Column(name) => self.eval_column(name, row),
            Expression::UnaryOp { op, operand } => {
                let value = self.eval(operand, row)?;
                Ok(value.map(|n| match op {
                    UnaryOperator::Negate => -n,
                }))
            }
            Expression::BinaryOp { left, op, right } => {
                let left = self.eval(left, row)?;
                let right = self.eval(right, row)?;
                Ok(match (left, right) {
                    (Some(l), Some(r)) => Some(apply(*op, l, r)),
                    _ => None,
                })
            }
        }
    }

    fn eval_column(&self, name: &str, row: usize) -> EngineResult<Option<f64>> {
        let cell = self
            .columns
            .get(name)
            .and_then(|&idx| self.table.cell(row, idx))
            .ok_or_else(|| EngineError::ExpressionColumn {
                expression: self.text.to_string(),
                column: name.to_string(),
            })?;

        if cell.is_null() {
            return Ok(None);
        }
        match cell.as_number() {
            Some(n) => Ok(Some(n)),
            None => Err(EngineError::ExpressionType {
                expression: self.text.to_string(),
                column: name.to_string(),
                row,
                value: cell.display_value(),
            }),
        }
    }
}

fn apply(op: BinaryOperator, l: f64, r: f64) -> f64 {
    match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Table {
        Table::from_rows(
            &["sales_amount", "quantity", "label"],
            vec![
                vec![CellValue::Number(1000.0), 4.0.into(), "a".into()],
                vec![CellValue::Number(1200.0), 0.0.into(), "b".into()],
                vec![CellValue::from("300"), CellValue::Null, "c".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn evaluates_division_per_row() {
        let values = evaluate_expression(&orders(), "sales_amount / quantity").unwrap();
        assert_eq!(values[0], CellValue::Number(250.0));
        // IEEE semantics for x / 0
        assert_eq!(values[1], CellValue::Number(f64::INFINITY));
        // Null operand propagates
        assert_eq!(values[2], CellValue::Null);
    }

    #[test]
    fn zero_over_zero_is_nan() {
        let table = Table::from_rows(&["a", "b"], vec![vec![0.0, 0.0]]).unwrap();
        let values = evaluate_expression(&table, "a / b").unwrap();
        match values[0] {
            CellValue::Number(n) => assert!(n.is_nan()),
            ref other => panic!("expected NaN, got {:?}", other),
        }
    }

    #[test]
    fn evaluates_constants_and_precedence() {
        let values = evaluate_expression(&orders(), "-sales_amount * 1.5 + 10").unwrap();
        assert_eq!(values[0], CellValue::Number(-1490.0));
        assert_eq!(values[2], CellValue::Number(-440.0));
    }

    #[test]
    fn unknown_column_is_reported_before_evaluation() {
        let err = evaluate_expression(&orders(), "price * quantity").unwrap_err();
        match err {
            EngineError::ExpressionColumn { column, .. } => assert_eq!(column, "price"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_numeric_operand_is_a_type_error() {
        let err = evaluate_expression(&orders(), "label + 1").unwrap_err();
        match err {
            EngineError::ExpressionType { column, row, value, .. } => {
                assert_eq!(column, "label");
                assert_eq!(row, 0);
                assert_eq!(value, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_failures_are_wrapped() {
        let err = evaluate_expression(&orders(), "sales_amount /").unwrap_err();
        assert!(matches!(err, EngineError::Parse { .. }));
    }

    #[test]
    fn descriptor_agrees_with_expression_string() {
        let table = orders();
        for (name, symbol) in [("add", "+"), ("subtract", "-"), ("multiply", "*"), ("divide", "/")] {
            let descriptor = ColumnOperation::parse(name, "sales_amount", "quantity").unwrap();
            let from_descriptor = calculate_expression(&table, &descriptor).unwrap();
            let from_string =
                evaluate_expression(&table, &format!("sales_amount {} quantity", symbol)).unwrap();
            assert_eq!(from_descriptor, from_string, "operation {}", name);
        }
    }

    #[test]
    fn unknown_operation_name_is_rejected() {
        let err = ColumnOperation::parse("concat", "a", "b").unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedOperation(op) if op == "concat"));
    }

    #[test]
    fn descriptor_deserializes_from_camel_case_json() {
        let json = r#"{"operation":"multiply","sourceColumn":"a","targetColumn":"b"}"#;
        let op: ColumnOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op, ColumnOperation::new(ArithmeticOperation::Multiply, "a", "b"));
    }
}
