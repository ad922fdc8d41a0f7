//! FILENAME: persistence/src/parquet_codec.rs
//! PURPOSE: Parquet reader and writer through Arrow record batches.
//! CONTEXT: Column types are chosen per column on write: Float64 when every
//! non-null cell is a number, Boolean when every non-null cell is a
//! boolean, Utf8 otherwise. All fields are nullable.

use crate::error::PersistenceResult;
use crate::typed_cell;
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use kpi_engine::{CellValue, Row, Table};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// WRITE
// ============================================================================

fn column_type<'a>(cells: impl Iterator<Item = &'a CellValue>) -> DataType {
    let mut numeric = true;
    let mut boolean = true;
    for cell in cells {
        match cell {
            CellValue::Null => {}
            CellValue::Number(_) => boolean = false,
            CellValue::Boolean(_) => numeric = false,
            CellValue::Text(_) => return DataType::Utf8,
        }
    }
    match (numeric, boolean) {
        (true, _) => DataType::Float64,
        (false, true) => DataType::Boolean,
        (false, false) => DataType::Utf8,
    }
}

fn build_array(table: &Table, col: usize, data_type: &DataType) -> ArrayRef {
    let cells = table.rows().iter().map(|row| &row[col]);
    match data_type {
        DataType::Float64 => Arc::new(cells.map(CellValue::as_number).collect::<Float64Array>()),
        DataType::Boolean => Arc::new(
            cells
                .map(|c| match c {
                    CellValue::Boolean(b) => Some(*b),
                    _ => None,
                })
                .collect::<BooleanArray>(),
        ),
        _ => Arc::new(
            cells
                .map(|c| (!c.is_null()).then(|| c.display_value()))
                .collect::<StringArray>(),
        ),
    }
}

pub fn write_parquet(table: &Table, path: &Path) -> PersistenceResult<()> {
    let types: Vec<DataType> = (0..table.column_count())
        .map(|c| column_type(table.rows().iter().map(|row| &row[c])))
        .collect();

    let schema = Arc::new(Schema::new(
        table
            .headers()
            .iter()
            .zip(&types)
            .map(|(name, dt)| Field::new(name, dt.clone(), true))
            .collect::<Vec<Field>>(),
    ));

    let columns: Vec<ArrayRef> = types
        .iter()
        .enumerate()
        .map(|(c, dt)| build_array(table, c, dt))
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = File::create(path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

// ============================================================================
// READ
// ============================================================================

pub fn read_parquet(path: &Path, infer_types: bool) -> PersistenceResult<Table> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let headers: Vec<String> = reader
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    let mut rows: Vec<Row> = Vec::new();
    for batch in reader.build()? {
        let batch = batch?;
        let start = rows.len();
        rows.extend((0..batch.num_rows()).map(|_| Vec::with_capacity(headers.len())));

        for column in batch.columns() {
            let cells = column_cells(column.as_ref())?;
            for (offset, cell) in cells.into_iter().enumerate() {
                rows[start + offset].push(typed_cell(cell, infer_types));
            }
        }
    }

    Ok(Table::new(headers, rows)?)
}

fn column_cells(array: &dyn Array) -> PersistenceResult<Vec<CellValue>> {
    let any = array.as_any();
    let len = array.len();
    let cell = |i: usize, f: &dyn Fn(usize) -> CellValue| {
        if array.is_null(i) {
            CellValue::Null
        } else {
            f(i)
        }
    };

    if let Some(a) = any.downcast_ref::<Float64Array>() {
        return Ok((0..len).map(|i| cell(i, &|i| CellValue::Number(a.value(i)))).collect());
    }
    if let Some(a) = any.downcast_ref::<Float32Array>() {
        return Ok((0..len).map(|i| cell(i, &|i| CellValue::Number(a.value(i) as f64))).collect());
    }
    if let Some(a) = any.downcast_ref::<Int64Array>() {
        return Ok((0..len).map(|i| cell(i, &|i| CellValue::Number(a.value(i) as f64))).collect());
    }
    if let Some(a) = any.downcast_ref::<Int32Array>() {
        return Ok((0..len).map(|i| cell(i, &|i| CellValue::Number(a.value(i) as f64))).collect());
    }
    if let Some(a) = any.downcast_ref::<BooleanArray>() {
        return Ok((0..len).map(|i| cell(i, &|i| CellValue::Boolean(a.value(i)))).collect());
    }
    if let Some(a) = any.downcast_ref::<StringArray>() {
        return Ok((0..len).map(|i| cell(i, &|i| CellValue::Text(a.value(i).to_string()))).collect());
    }
    if let Some(a) = any.downcast_ref::<LargeStringArray>() {
        return Ok((0..len).map(|i| cell(i, &|i| CellValue::Text(a.value(i).to_string()))).collect());
    }

    // Dates, decimals, and other logical types render through Arrow's formatter
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)?;
    Ok((0..len)
        .map(|i| cell(i, &|i| CellValue::Text(formatter.value(i).to_string())))
        .collect())
}
