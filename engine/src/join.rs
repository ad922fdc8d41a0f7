//! FILENAME: engine/src/join.rs
//! PURPOSE: Relational equi-join of two tables on one or more key pairs.
//! CONTEXT: Hash join. The build side is hashed on its key tuple; the probe
//! side is walked in row order, so output order is deterministic:
//! - inner/left/outer: left row order, matches in right row order;
//!   outer then appends unmatched right rows in right order.
//! - right: right row order, matches in left row order.
//! Multiple matches produce the full cross-product. Null and NaN key cells
//! are one value: they match each other and nothing else.
//!
//! OUTPUT COLUMNS: all left columns, then all right columns except key
//! columns whose name equals their paired left key (those are merged and
//! filled from whichever side is present). Remaining name collisions get
//! the left/right suffixes. A suffixed name that still collides is an error.

use crate::error::{EngineError, EngineResult};
use crate::logging::{self, log_debug, log_enter, log_exit, log_warn};
use crate::table::{Row, Table};
use crate::value::CellValue;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_SUFFIXES: (&str, &str) = ("_x", "_y");

// ============================================================================
// JOIN TYPE & KEYS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
}

impl Default for JoinType {
    fn default() -> Self {
        JoinType::Inner
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        })
    }
}

impl FromStr for JoinType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "outer" | "full" => Ok(JoinType::Outer),
            _ => Err(EngineError::UnsupportedOperation(format!("join type '{}'", s))),
        }
    }
}

/// One column name or an ordered list of names forming a composite key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JoinKeys {
    Single(String),
    Composite(Vec<String>),
}

impl JoinKeys {
    pub fn names(&self) -> &[String] {
        match self {
            JoinKeys::Single(name) => std::slice::from_ref(name),
            JoinKeys::Composite(names) => names,
        }
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }
}

impl From<&str> for JoinKeys {
    fn from(name: &str) -> Self {
        JoinKeys::Single(name.to_string())
    }
}

impl From<String> for JoinKeys {
    fn from(name: String) -> Self {
        JoinKeys::Single(name)
    }
}

impl From<Vec<String>> for JoinKeys {
    fn from(names: Vec<String>) -> Self {
        JoinKeys::Composite(names)
    }
}

impl From<Vec<&str>> for JoinKeys {
    fn from(names: Vec<&str>) -> Self {
        JoinKeys::Composite(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for JoinKeys {
    fn from(names: &[&str]) -> Self {
        JoinKeys::Composite(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for JoinKeys {
    fn from(names: [&str; N]) -> Self {
        JoinKeys::Composite(names.iter().map(|n| n.to_string()).collect())
    }
}

// ============================================================================
// KEY HASHING
// ============================================================================

/// Hashable projection of a key cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Number(u64),
    Text(String),
    Boolean(bool),
}

impl KeyPart {
    fn from_cell(cell: &CellValue) -> KeyPart {
        match cell {
            CellValue::Null => KeyPart::Null,
            CellValue::Number(n) if n.is_nan() => KeyPart::Null,
            // -0.0 and 0.0 are the same key
            CellValue::Number(n) => KeyPart::Number((n + 0.0).to_bits()),
            CellValue::Text(s) => KeyPart::Text(s.clone()),
            CellValue::Boolean(b) => KeyPart::Boolean(*b),
        }
    }
}

fn row_key(row: &Row, indices: &[usize]) -> Vec<KeyPart> {
    indices.iter().map(|&i| KeyPart::from_cell(&row[i])).collect()
}

fn build_index(rows: &[Row], indices: &[usize]) -> FxHashMap<Vec<KeyPart>, Vec<usize>> {
    let mut index: FxHashMap<Vec<KeyPart>, Vec<usize>> = FxHashMap::default();
    for (i, row) in rows.iter().enumerate() {
        index.entry(row_key(row, indices)).or_default().push(i);
    }
    index
}

// ============================================================================
// JOIN ENGINE
// ============================================================================

/// Configurable join. Names are only used in error messages.
#[derive(Debug, Clone)]
pub struct JoinEngine<'a> {
    suffixes: (&'a str, &'a str),
    left_name: &'a str,
    right_name: &'a str,
}

impl Default for JoinEngine<'_> {
    fn default() -> Self {
        JoinEngine {
            suffixes: DEFAULT_SUFFIXES,
            left_name: "left",
            right_name: "right",
        }
    }
}

/// Resolved output layout shared by every emitted row.
struct Layout {
    left_keys: Vec<usize>,
    right_keys: Vec<usize>,
    /// For each left column: the right column to fall back to when the left
    /// side is missing (merged key columns only).
    left_fallback: Vec<Option<usize>>,
    /// Right columns that appear in the output, in right order.
    right_emitted: Vec<usize>,
}

impl<'a> JoinEngine<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffixes(mut self, left: &'a str, right: &'a str) -> Self {
        self.suffixes = (left, right);
        self
    }

    pub fn with_names(mut self, left: &'a str, right: &'a str) -> Self {
        self.left_name = left;
        self.right_name = right;
        self
    }

    pub fn join(
        &self,
        left: &Table,
        right: &Table,
        left_on: &JoinKeys,
        right_on: &JoinKeys,
        how: JoinType,
    ) -> EngineResult<Table> {
        log_enter!(
            logging::JOIN,
            "join",
            "{} x {} how={} on={:?}/{:?}",
            self.left_name,
            self.right_name,
            how,
            left_on.names(),
            right_on.names()
        );

        let layout = self.layout(left, right, left_on, right_on)?;
        let headers = self.output_headers(left, right, &layout)?;

        let mut rows = Vec::new();
        match how {
            JoinType::Inner | JoinType::Left | JoinType::Outer => {
                let index = build_index(right.rows(), &layout.right_keys);
                let mut right_matched = vec![false; right.row_count()];

                for (i, lrow) in left.rows().iter().enumerate() {
                    let matches = index.get(&row_key(lrow, &layout.left_keys));
                    match matches {
                        Some(js) => {
                            for &j in js {
                                right_matched[j] = true;
                                rows.push(combine(left, right, &layout, Some(i), Some(j)));
                            }
                        }
                        None if how != JoinType::Inner => {
                            rows.push(combine(left, right, &layout, Some(i), None));
                        }
                        None => {}
                    }
                }

                if how == JoinType::Outer {
                    for (j, matched) in right_matched.iter().enumerate() {
                        if !matched {
                            rows.push(combine(left, right, &layout, None, Some(j)));
                        }
                    }
                }
            }
            JoinType::Right => {
                let index = build_index(left.rows(), &layout.left_keys);
                for (j, rrow) in right.rows().iter().enumerate() {
                    let matches = index.get(&row_key(rrow, &layout.right_keys));
                    match matches {
                        Some(is) => {
                            for &i in is {
                                rows.push(combine(left, right, &layout, Some(i), Some(j)));
                            }
                        }
                        None => rows.push(combine(left, right, &layout, None, Some(j))),
                    }
                }
            }
        }

        let table = Table::new(headers, rows)?;
        log_exit!(
            logging::JOIN,
            "join",
            "rows={} cols={}",
            table.row_count(),
            table.column_count()
        );
        Ok(table)
    }

    fn layout(
        &self,
        left: &Table,
        right: &Table,
        left_on: &JoinKeys,
        right_on: &JoinKeys,
    ) -> EngineResult<Layout> {
        if left_on.len() != right_on.len() {
            return Err(EngineError::KeyArityMismatch {
                left: left_on.len(),
                right: right_on.len(),
            });
        }
        if left_on.is_empty() {
            return Err(EngineError::EmptyJoinKeys);
        }

        let left_keys = resolve(left, self.left_name, left_on)?;
        let right_keys = resolve(right, self.right_name, right_on)?;

        let mut left_fallback = vec![None; left.column_count()];
        let mut merged_right = FxHashSet::default();
        for (lk, rk) in left_keys.iter().zip(&right_keys) {
            if left.headers()[*lk] == right.headers()[*rk] {
                left_fallback[*lk] = Some(*rk);
                merged_right.insert(*rk);
            }
        }

        let right_emitted = (0..right.column_count())
            .filter(|c| !merged_right.contains(c))
            .collect();

        Ok(Layout {
            left_keys,
            right_keys,
            left_fallback,
            right_emitted,
        })
    }

    fn output_headers(&self, left: &Table, right: &Table, layout: &Layout) -> EngineResult<Vec<String>> {
        let right_names: FxHashSet<&str> = layout
            .right_emitted
            .iter()
            .map(|&c| right.headers()[c].as_str())
            .collect();
        let left_names: FxHashSet<&str> = left.headers().iter().map(String::as_str).collect();

        let mut headers = Vec::with_capacity(left.column_count() + layout.right_emitted.len());
        for name in left.headers() {
            if right_names.contains(name.as_str()) {
                headers.push(format!("{}{}", name, self.suffixes.0));
            } else {
                headers.push(name.clone());
            }
        }
        for &c in &layout.right_emitted {
            let name = &right.headers()[c];
            if left_names.contains(name.as_str()) {
                headers.push(format!("{}{}", name, self.suffixes.1));
            } else {
                headers.push(name.clone());
            }
        }

        let duplicate = {
            let mut seen = FxHashSet::default();
            headers.iter().find(|h| !seen.insert(h.as_str())).cloned()
        };
        if let Some(column) = duplicate {
            log_warn!(logging::JOIN, "join output repeats column '{}'", column);
            return Err(EngineError::JoinColumnCollision {
                left: self.left_name.to_string(),
                right: self.right_name.to_string(),
                column,
            });
        }

        log_debug!(logging::JOIN, "output headers {:?}", headers);
        Ok(headers)
    }
}

fn resolve(table: &Table, dataset: &str, keys: &JoinKeys) -> EngineResult<Vec<usize>> {
    keys.names()
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| EngineError::UnknownColumn {
                    dataset: dataset.to_string(),
                    column: name.clone(),
                })
        })
        .collect()
}

fn combine(left: &Table, right: &Table, layout: &Layout, li: Option<usize>, rj: Option<usize>) -> Row {
    let mut row = Vec::with_capacity(left.column_count() + layout.right_emitted.len());

    for c in 0..left.column_count() {
        let value = match (li, rj, layout.left_fallback[c]) {
            (Some(i), _, _) => left.rows()[i][c].clone(),
            (None, Some(j), Some(rc)) => right.rows()[j][rc].clone(),
            _ => CellValue::Null,
        };
        row.push(value);
    }
    for &c in &layout.right_emitted {
        row.push(match rj {
            Some(j) => right.rows()[j][c].clone(),
            None => CellValue::Null,
        });
    }
    row
}

/// Standalone join with default suffixes, for callers that hold tables directly.
pub fn join_tables(
    left: &Table,
    right: &Table,
    left_on: impl Into<JoinKeys>,
    right_on: impl Into<JoinKeys>,
    how: JoinType,
) -> EngineResult<Table> {
    JoinEngine::default().join(left, right, &left_on.into(), &right_on.into(), how)
}
