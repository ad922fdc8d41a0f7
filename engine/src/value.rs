//! FILENAME: engine/src/value.rs
//! PURPOSE: Defines the cell value stored in every table position.
//! CONTEXT: Values are untyped at rest. Numeric meaning is only imposed
//! when an expression or aggregate asks for it, through `as_number`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The raw content of one table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Null, or a number that is NaN. Reductions and summaries skip both.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Attempts to coerce the value to a number.
    /// Booleans count as 1/0 and text is parsed after trimming.
    /// Returns None for Null and for text that is not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Null => None,
        }
    }

    /// Infers a typed value from raw text, the way delimited readers do:
    /// empty --> Null, numeric --> Number, true/false --> Boolean, else Text.
    pub fn infer(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Null;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            // "inf"/"nan" spelled as words stay text
            if n.is_finite() || trimmed.chars().any(|c| c.is_ascii_digit()) {
                return CellValue::Number(n);
            }
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => CellValue::Boolean(true),
            "false" => CellValue::Boolean(false),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    /// Estimated heap + inline footprint in bytes, used by dataset summaries.
    pub fn estimated_size(&self) -> usize {
        match self {
            // Boxed string object: pointer + header + payload
            CellValue::Text(s) => 8 + 49 + s.len(),
            _ => 8,
        }
    }

    /// Stable textual rendering used by delimited writers.
    /// Integral numbers drop the fractional part; Null renders empty.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => {
                if *b { "True" } else { "False" }.to_string()
            }
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Null
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_value())
    }
}

/// Format without unnecessary decimal places.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}
