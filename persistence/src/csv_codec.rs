//! FILENAME: persistence/src/csv_codec.rs
//! PURPOSE: Delimited text reader and writer.
//! CONTEXT: The first record is the header row. Reading sniffs a `;` or tab
//! delimiter from the header line; writing uses the configured separator.
//! A UTF-8 byte order mark is skipped on read and written for "utf-8-sig".

use crate::error::{PersistenceError, PersistenceResult};
use crate::text_cell;
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, WriterBuilder};
use kpi_engine::{CellValue, CsvOptions, Table};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn read_csv(path: &Path, infer_types: bool) -> PersistenceResult<Table> {
    let delimiter = detect_delimiter(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|field| text_cell(field, infer_types)).collect());
    }

    Ok(Table::new(headers, rows)?)
}

fn detect_delimiter(path: &Path) -> PersistenceResult<u8> {
    let mut first_line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first_line)?;

    Ok(if first_line.contains(',') {
        b','
    } else if first_line.contains(';') {
        b';'
    } else if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    })
}

pub fn write_csv(table: &Table, path: &Path, options: &CsvOptions) -> PersistenceResult<()> {
    if !options.separator.is_ascii() {
        return Err(PersistenceError::InvalidFormat(format!(
            "separator {:?} is not a single-byte character",
            options.separator
        )));
    }

    let mut file = File::create(path)?;
    match options.encoding.to_ascii_lowercase().replace('_', "-").as_str() {
        "utf-8" | "utf8" => {}
        "utf-8-sig" | "utf8-sig" => file.write_all(UTF8_BOM)?,
        other => return Err(PersistenceError::UnsupportedEncoding(other.to_string())),
    }

    let mut writer = WriterBuilder::new()
        .delimiter(options.separator as u8)
        .from_writer(file);

    writer.write_record(table.headers())?;
    for row in table.rows() {
        let fields = row
            .iter()
            .map(|cell| render(cell, options.date_format.as_deref()))
            .collect::<PersistenceResult<Vec<String>>>()?;
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

fn render(cell: &CellValue, date_format: Option<&str>) -> PersistenceResult<String> {
    match (cell, date_format) {
        (CellValue::Text(s), Some(fmt)) => match parse_iso_datetime(s) {
            Some(dt) => {
                let mut out = String::new();
                write!(out, "{}", dt.format(fmt)).map_err(|_| {
                    PersistenceError::InvalidFormat(format!("invalid date format '{}'", fmt))
                })?;
                Ok(out)
            }
            None => Ok(s.clone()),
        },
        _ => Ok(cell.display_value()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
