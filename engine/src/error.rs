//! FILENAME: engine/src/error.rs
//! PURPOSE: The engine's closed error taxonomy.
//! CONTEXT: Every fallible engine operation returns `EngineResult<T>`. Messages
//! name the dataset, column, or index involved. Collaborator failures (codec,
//! SQL) are carried as the boxed `source` of the wrapping variant.

use thiserror::Error;
use uuid::Uuid;

/// Error type returned by collaborators (file codec, SQL executor).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to load dataset '{name}': {message}")]
    Load {
        name: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Dataset '{0}' not found")]
    DatasetNotFound(String),

    #[error("History item {0} not found")]
    ItemNotFound(Uuid),

    #[error("Column '{column}' not found in dataset '{dataset}'")]
    UnknownColumn { dataset: String, column: String },

    #[error("Column '{column}' in dataset '{dataset}' has non-numeric value {value:?} at row {row}")]
    NonNumeric {
        dataset: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Expression '{expression}': column '{column}' has non-numeric value {value:?} at row {row}")]
    ExpressionType {
        expression: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Expression '{expression}' references unknown column '{column}'")]
    ExpressionColumn { expression: String, column: String },

    #[error("Invalid expression '{expression}': {source}")]
    Parse {
        expression: String,
        #[source]
        source: kpi_parser::ParseError,
    },

    #[error("Cannot compute {operation} of empty column '{column}' in dataset '{dataset}'")]
    EmptyAggregate {
        dataset: String,
        column: String,
        operation: String,
    },

    #[error("Join key arity mismatch: {left} left key(s) vs {right} right key(s)")]
    KeyArityMismatch { left: usize, right: usize },

    #[error("Joining '{left}' with '{right}' would produce duplicate column '{column}'")]
    JoinColumnCollision {
        left: String,
        right: String,
        column: String,
    },

    #[error("Join requires at least one key column")]
    EmptyJoinKeys,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Cell ({row}, {col}) is out of range for a {rows}x{cols} table")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("No current data item")]
    NoCurrentData,

    #[error("Invalid table: {0}")]
    InvalidTable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to import '{source_ref}': {source}")]
    Import {
        source_ref: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to export to '{path}': {source}")]
    Export {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to update item {id}: {message}")]
    Update { id: Uuid, message: String },
}

impl EngineError {
    /// Suggested HTTP status for hosts that expose the engine over HTTP:
    /// 404 for unknown datasets/items, 400 for validation and type errors,
    /// 500 for I/O and collaborator failures.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::DatasetNotFound(_) | EngineError::ItemNotFound(_) => 404,
            EngineError::Load { .. }
            | EngineError::Import { .. }
            | EngineError::Export { .. }
            | EngineError::Update { .. } => 500,
            _ => 400,
        }
    }

    pub(crate) fn load(name: &str, message: impl Into<String>, source: Option<BoxError>) -> Self {
        EngineError::Load {
            name: name.to_string(),
            message: message.into(),
            source,
        }
    }

    pub(crate) fn export(path: &std::path::Path, source: impl Into<BoxError>) -> Self {
        EngineError::Export {
            path: path.display().to_string(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_dataset_and_column() {
        let err = EngineError::UnknownColumn {
            dataset: "sales".to_string(),
            column: "qty".to_string(),
        };
        assert_eq!(err.to_string(), "Column 'qty' not found in dataset 'sales'");
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(EngineError::DatasetNotFound("x".into()).status_code(), 404);
        assert_eq!(EngineError::NoCurrentData.status_code(), 400);
        assert_eq!(
            EngineError::KeyArityMismatch { left: 1, right: 2 }.status_code(),
            400
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            EngineError::export(std::path::Path::new("out.csv"), io).status_code(),
            500
        );
    }
}
