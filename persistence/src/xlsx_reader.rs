//! FILENAME: persistence/src/xlsx_reader.rs

use crate::error::{PersistenceError, PersistenceResult};
use crate::typed_cell;
use calamine::{open_workbook, Data, Reader, Xlsx};
use kpi_engine::{format_number, CellValue, Table};
use std::path::Path;

/// Reads one worksheet (the first when `sheet` is None). The first row
/// holds the column names.
pub fn read_xlsx(path: &Path, sheet: Option<&str>, infer_types: bool) -> PersistenceResult<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    if sheet_names.is_empty() {
        return Err(PersistenceError::InvalidFormat(
            "Workbook contains no sheets".to_string(),
        ));
    }

    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .ok_or_else(|| PersistenceError::SheetNotFound(name.to_string()))?
            .clone(),
        None => sheet_names[0].clone(),
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("Unnamed: {}", i),
                Data::Float(f) => format_number(*f),
                other => other.to_string(),
            })
            .collect(),
        None => Vec::new(),
    };

    let rows = rows_iter
        .map(|row| {
            row.iter()
                .map(|cell| typed_cell(convert(cell), infer_types))
                .collect()
        })
        .collect();

    Ok(Table::new(headers, rows)?)
}

fn convert(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Text(format!("{:?}", e)),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
