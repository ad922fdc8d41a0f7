//! FILENAME: engine/src/config.rs
//! PURPOSE: Tunables shared by TableStore and HistoryLedger.
//! CONTEXT: Every field has a default, so a partial JSON document (or none
//! at all) is a valid configuration.

use crate::error::{EngineError, EngineResult};
use crate::io::ExportOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Suffixes for non-key columns present on both sides of a join.
    pub join_suffixes: (String, String),
    /// Appended to a history item's name on every cell update.
    pub updated_suffix: String,
    /// chrono format for the timestamp part of imported item names.
    pub import_name_timestamp: String,
    pub infer_types_on_load: bool,
    pub infer_types_on_import: bool,
    pub export: ExportOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            join_suffixes: ("_x".to_string(), "_y".to_string()),
            updated_suffix: "_updated".to_string(),
            import_name_timestamp: "%Y%m%d_%H%M%S".to_string(),
            infer_types_on_load: true,
            infer_types_on_import: false,
            export: ExportOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidArgument(format!("invalid engine config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::JsonOrient;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config = EngineConfig::from_json(
            r#"{"join_suffixes": ["_left", "_right"], "export": {"json": {"orient": "split"}}}"#,
        )
        .unwrap();
        assert_eq!(config.join_suffixes.0, "_left");
        assert_eq!(config.updated_suffix, "_updated");
        assert_eq!(config.export.json.orient, JsonOrient::Split);
        assert!(config.infer_types_on_load);
        assert!(!config.infer_types_on_import);
    }

    #[test]
    fn malformed_document_is_an_invalid_argument() {
        assert!(matches!(
            EngineConfig::from_json("{\"updated_suffix\": 3}"),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
