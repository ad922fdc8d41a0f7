//! FILENAME: persistence/src/json_codec.rs
//! PURPOSE: JSON reader and writer for the pandas-style document shapes.
//! CONTEXT: Object keys keep document order (serde_json `preserve_order`),
//! so column order survives a write/read cycle. Non-finite numbers are
//! written as null.

use crate::error::{PersistenceError, PersistenceResult};
use crate::typed_cell;
use kpi_engine::{CellValue, JsonOrient, Row, Table};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

// ============================================================================
// WRITE
// ============================================================================

pub fn write_json(table: &Table, path: &Path, orient: JsonOrient) -> PersistenceResult<()> {
    let document = to_document(table, orient);
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &document)?;
    writer.flush()?;
    Ok(())
}

fn to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::Text(s) => Value::String(s.clone()),
    }
}

fn row_object(headers: &[String], row: &Row) -> Value {
    Value::Object(
        headers
            .iter()
            .zip(row)
            .map(|(h, cell)| (h.clone(), to_value(cell)))
            .collect(),
    )
}

fn row_array(row: &Row) -> Value {
    Value::Array(row.iter().map(to_value).collect())
}

pub(crate) fn to_document(table: &Table, orient: JsonOrient) -> Value {
    let headers = table.headers();
    let rows = table.rows();

    match orient {
        JsonOrient::Records => Value::Array(rows.iter().map(|row| row_object(headers, row)).collect()),
        JsonOrient::Values => Value::Array(rows.iter().map(row_array).collect()),
        JsonOrient::Index => Value::Object(
            rows.iter()
                .enumerate()
                .map(|(i, row)| (i.to_string(), row_object(headers, row)))
                .collect(),
        ),
        JsonOrient::Columns => Value::Object(
            headers
                .iter()
                .enumerate()
                .map(|(c, h)| {
                    let column: Map<String, Value> = rows
                        .iter()
                        .enumerate()
                        .map(|(i, row)| (i.to_string(), to_value(&row[c])))
                        .collect();
                    (h.clone(), Value::Object(column))
                })
                .collect(),
        ),
        JsonOrient::Split => {
            let mut document = Map::new();
            document.insert(
                "columns".to_string(),
                Value::Array(headers.iter().cloned().map(Value::String).collect()),
            );
            document.insert(
                "index".to_string(),
                Value::Array((0..rows.len()).map(Value::from).collect()),
            );
            document.insert(
                "data".to_string(),
                Value::Array(rows.iter().map(row_array).collect()),
            );
            Value::Object(document)
        }
    }
}

// ============================================================================
// READ
// ============================================================================

/// Reads records, values, split, or columns shaped documents.
pub fn read_json(path: &Path, infer_types: bool) -> PersistenceResult<Table> {
    let document: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    from_document(document, infer_types)
}

fn from_value(value: Value, infer_types: bool) -> CellValue {
    let cell = match value {
        Value::Null => CellValue::Null,
        Value::Bool(b) => CellValue::Boolean(b),
        Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
        Value::String(s) => CellValue::Text(s),
        nested => CellValue::Text(nested.to_string()),
    };
    typed_cell(cell, infer_types)
}

pub(crate) fn from_document(document: Value, infer_types: bool) -> PersistenceResult<Table> {
    match document {
        Value::Array(items) if items.iter().all(Value::is_object) => from_records(items, infer_types),
        Value::Array(items) if items.iter().all(Value::is_array) => from_values(items, infer_types),
        Value::Object(mut map) if map.contains_key("columns") && map.contains_key("data") => {
            let columns = map.remove("columns").unwrap_or(Value::Null);
            let data = map.remove("data").unwrap_or(Value::Null);
            from_split(columns, data, infer_types)
        }
        Value::Object(map) if map.values().all(Value::is_object) => from_columns(map, infer_types),
        _ => Err(PersistenceError::InvalidFormat(
            "unrecognized JSON table layout".to_string(),
        )),
    }
}

fn from_records(items: Vec<Value>, infer_types: bool) -> PersistenceResult<Table> {
    let mut headers: Vec<String> = Vec::new();
    for item in &items {
        if let Value::Object(obj) = item {
            for key in obj.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
    }

    let rows = items
        .into_iter()
        .map(|item| {
            let mut obj = match item {
                Value::Object(obj) => obj,
                _ => Map::new(),
            };
            headers
                .iter()
                .map(|h| from_value(obj.remove(h).unwrap_or(Value::Null), infer_types))
                .collect()
        })
        .collect();

    Ok(Table::new(headers, rows)?)
}

fn from_values(items: Vec<Value>, infer_types: bool) -> PersistenceResult<Table> {
    let width = items
        .iter()
        .filter_map(Value::as_array)
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    let headers = (0..width).map(|i| i.to_string()).collect();
    let rows = items
        .into_iter()
        .map(|item| padded_row(item, width, infer_types))
        .collect();
    Ok(Table::new(headers, rows)?)
}

fn from_split(columns: Value, data: Value, infer_types: bool) -> PersistenceResult<Table> {
    let headers: Vec<String> = match columns {
        Value::Array(cols) => cols
            .into_iter()
            .map(|c| match c {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => {
            return Err(PersistenceError::InvalidFormat(
                "split document 'columns' must be an array".to_string(),
            ))
        }
    };
    let rows = match data {
        Value::Array(rows) => rows
            .into_iter()
            .map(|row| padded_row(row, headers.len(), infer_types))
            .collect(),
        _ => {
            return Err(PersistenceError::InvalidFormat(
                "split document 'data' must be an array".to_string(),
            ))
        }
    };
    Ok(Table::new(headers, rows)?)
}

fn from_columns(map: Map<String, Value>, infer_types: bool) -> PersistenceResult<Table> {
    let mut index: Vec<String> = Vec::new();
    for column in map.values() {
        if let Value::Object(cells) = column {
            for key in cells.keys() {
                if !index.contains(key) {
                    index.push(key.clone());
                }
            }
        }
    }

    let headers: Vec<String> = map.keys().cloned().collect();
    let mut columns: Vec<Map<String, Value>> = map
        .into_iter()
        .map(|(_, column)| match column {
            Value::Object(cells) => cells,
            _ => Map::new(),
        })
        .collect();

    let rows = index
        .iter()
        .map(|key| {
            columns
                .iter_mut()
                .map(|cells| from_value(cells.remove(key).unwrap_or(Value::Null), infer_types))
                .collect()
        })
        .collect();

    Ok(Table::new(headers, rows)?)
}

fn padded_row(value: Value, width: usize, infer_types: bool) -> Row {
    let mut cells: Row = match value {
        Value::Array(cells) => cells
            .into_iter()
            .map(|v| from_value(v, infer_types))
            .collect(),
        _ => Vec::new(),
    };
    cells.resize(width, CellValue::Null);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_rows(
            &["b", "a"],
            vec![
                vec![CellValue::from("x"), 1.0.into()],
                vec![CellValue::Null, f64::NAN.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn records_orient_keeps_column_order() {
        let doc = to_document(&sample(), JsonOrient::Records);
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"[{"b":"x","a":1.0},{"b":null,"a":null}]"#
        );
    }

    #[test]
    fn columns_and_split_orients() {
        let columns = to_document(&sample(), JsonOrient::Columns);
        assert_eq!(columns, json!({"b": {"0": "x", "1": null}, "a": {"0": 1.0, "1": null}}));

        let split = to_document(&sample(), JsonOrient::Split);
        assert_eq!(
            split,
            json!({"columns": ["b", "a"], "index": [0, 1], "data": [["x", 1.0], [null, null]]})
        );
    }

    #[test]
    fn every_written_orient_except_index_reads_back() {
        for orient in [JsonOrient::Records, JsonOrient::Columns, JsonOrient::Split] {
            let table = from_document(to_document(&sample(), orient), true).unwrap();
            assert_eq!(table.headers(), ["b", "a"], "orient {:?}", orient);
            assert_eq!(table.rows()[0], vec![CellValue::from("x"), CellValue::Number(1.0)]);
        }
        let values = from_document(to_document(&sample(), JsonOrient::Values), true).unwrap();
        assert_eq!(values.headers(), ["0", "1"]);
    }

    #[test]
    fn records_with_missing_keys_fill_nulls() {
        let table = from_document(json!([{"a": 1}, {"b": "y"}]), true).unwrap();
        assert_eq!(table.headers(), ["a", "b"]);
        assert_eq!(table.rows()[1], vec![CellValue::Null, CellValue::from("y")]);
    }

    #[test]
    fn untyped_read_keeps_text() {
        let table = from_document(json!([{"n": 2000, "ok": true}]), false).unwrap();
        assert_eq!(table.rows()[0], vec![CellValue::from("2000"), CellValue::from("True")]);
    }

    #[test]
    fn scalar_document_is_rejected() {
        assert!(matches!(
            from_document(json!(42), true),
            Err(PersistenceError::InvalidFormat(_))
        ));
    }
}
