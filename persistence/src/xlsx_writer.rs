//! FILENAME: persistence/src/xlsx_writer.rs

use crate::error::{PersistenceError, PersistenceResult};
use kpi_engine::{CellValue, ExcelOptions, Table};
use rust_xlsxwriter::{Format, FormatBorder, Workbook as XlsxWorkbook};
use std::path::Path;

/// Excel's hard column limit.
const MAX_COLUMNS: usize = 16_384;

/// Writes the table to a single worksheet: bold header row, then one row
/// per record. Nulls and NaN are left blank; infinities become text.
pub fn write_xlsx(table: &Table, path: &Path, options: &ExcelOptions) -> PersistenceResult<()> {
    if table.column_count() > MAX_COLUMNS {
        return Err(PersistenceError::InvalidFormat(format!(
            "{} columns exceed the worksheet limit of {}",
            table.column_count(),
            MAX_COLUMNS
        )));
    }

    let mut xlsx = XlsxWorkbook::new();
    let worksheet = xlsx.add_worksheet();
    worksheet.set_name(&options.sheet_name)?;

    let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);
    for (col, name) in table.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let excel_row = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let col = c as u16;
            match cell {
                CellValue::Null => {}
                CellValue::Number(n) if n.is_nan() => {}
                CellValue::Number(n) if n.is_infinite() => {
                    let text = if *n > 0.0 { "inf" } else { "-inf" };
                    worksheet.write_string(excel_row, col, text)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number(excel_row, col, *n)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(excel_row, col, s)?;
                }
                CellValue::Boolean(b) => {
                    worksheet.write_boolean(excel_row, col, *b)?;
                }
            }
        }
    }

    xlsx.save(path)?;
    Ok(())
}
