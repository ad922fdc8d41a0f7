//! FILENAME: engine/src/io.rs
//! PURPOSE: Collaborator seams for file and database I/O, plus the
//! per-format option types they accept.
//! CONTEXT: The engine never touches a file format or database driver
//! directly. `kpi-persistence` implements these traits; tests use in-memory
//! fakes. Errors cross the seam boxed and are wrapped by the caller.

use crate::error::{BoxError, EngineError};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// FORMATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Excel,
    Json,
    Parquet,
}

impl FileFormat {
    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
            FileFormat::Json => "json",
            FileFormat::Parquet => "parquet",
        }
    }

    /// Guesses the format from the file extension; anything unrecognized is CSV.
    pub fn from_path(path: &Path) -> FileFormat {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("xlsx") | Some("xlsm") | Some("xls") => FileFormat::Excel,
            Some("json") => FileFormat::Json,
            Some("parquet") => FileFormat::Parquet,
            _ => FileFormat::Csv,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "excel" | "xlsx" => Ok(FileFormat::Excel),
            "json" => Ok(FileFormat::Json),
            "parquet" => Ok(FileFormat::Parquet),
            _ => Err(EngineError::UnsupportedFormat(s.to_string())),
        }
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Explicit format; None means guess from the extension.
    pub format: Option<FileFormat>,
    /// Typed cells (numbers, booleans, nulls) instead of raw text.
    pub infer_types: bool,
}

impl ReadOptions {
    pub fn resolve_format(&self, path: &Path) -> FileFormat {
        self.format.unwrap_or_else(|| FileFormat::from_path(path))
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            format: None,
            infer_types: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub separator: char,
    /// "utf-8" or "utf-8-sig" (UTF-8 with byte order mark).
    pub encoding: String,
    /// chrono format applied to text cells holding ISO dates.
    pub date_format: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            separator: ',',
            encoding: "utf-8".to_string(),
            date_format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcelOptions {
    pub sheet_name: String,
}

impl Default for ExcelOptions {
    fn default() -> Self {
        ExcelOptions {
            sheet_name: "Sheet1".to_string(),
        }
    }
}

/// JSON document shapes, named after the pandas `orient` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonOrient {
    /// `{column: {row_index: value}}`
    #[default]
    Columns,
    /// `[{column: value}]`
    Records,
    /// `{row_index: {column: value}}`
    Index,
    /// `{"columns": [...], "index": [...], "data": [[...]]}`
    Split,
    /// `[[...]]`
    Values,
}

impl FromStr for JsonOrient {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "columns" => Ok(JsonOrient::Columns),
            "records" => Ok(JsonOrient::Records),
            "index" => Ok(JsonOrient::Index),
            "split" => Ok(JsonOrient::Split),
            "values" => Ok(JsonOrient::Values),
            _ => Err(EngineError::UnsupportedOperation(format!("json orient '{}'", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    pub orient: JsonOrient,
}

/// Per-format export options. Each writer reads only its own section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub csv: CsvOptions,
    pub excel: ExcelOptions,
    pub json: JsonOptions,
}

/// What `write_table` does when the destination table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    #[default]
    Fail,
    Replace,
    Append,
}

impl FromStr for IfExists {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            _ => Err(EngineError::UnsupportedOperation(format!("if_exists '{}'", s))),
        }
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Reads and writes whole tables as files.
/// Implementations must not create parent directories; callers do.
pub trait TableCodec {
    fn read(&self, path: &Path, options: &ReadOptions) -> Result<Table, BoxError>;

    fn write(
        &self,
        table: &Table,
        path: &Path,
        format: FileFormat,
        options: &ExportOptions,
    ) -> Result<(), BoxError>;
}

/// Runs SQL against a database. Each call opens and releases its own
/// connection.
pub trait QueryExecutor {
    fn execute(&self, query: &str) -> Result<Table, BoxError>;

    fn write_table(&self, table: &Table, table_name: &str, if_exists: IfExists) -> Result<(), BoxError>;

    /// Human-readable connection reference recorded as provenance.
    fn connection_label(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("CSV".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert_eq!("xlsx".parse::<FileFormat>().unwrap(), FileFormat::Excel);
        assert_eq!("Excel".parse::<FileFormat>().unwrap(), FileFormat::Excel);
        assert_eq!("parquet".parse::<FileFormat>().unwrap(), FileFormat::Parquet);
        assert!(matches!(
            "xml".parse::<FileFormat>(),
            Err(EngineError::UnsupportedFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn format_from_extension_defaults_to_csv() {
        assert_eq!(FileFormat::from_path(Path::new("a/b.JSON")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("book.xlsx")), FileFormat::Excel);
        assert_eq!(FileFormat::from_path(Path::new("data.txt")), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("noext")), FileFormat::Csv);
    }

    #[test]
    fn explicit_read_format_wins() {
        let opts = ReadOptions {
            format: Some(FileFormat::Json),
            ..Default::default()
        };
        assert_eq!(opts.resolve_format(Path::new("x.csv")), FileFormat::Json);
    }

    #[test]
    fn export_options_deserialize_with_defaults() {
        let opts: ExportOptions =
            serde_json::from_str(r#"{"csv": {"separator": ";"}, "json": {"orient": "records"}}"#).unwrap();
        assert_eq!(opts.csv.separator, ';');
        assert_eq!(opts.csv.encoding, "utf-8");
        assert_eq!(opts.json.orient, JsonOrient::Records);
        assert_eq!(opts.excel.sheet_name, "Sheet1");
    }
}
