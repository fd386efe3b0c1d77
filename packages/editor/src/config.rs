use crate::errors::{EditorError, EditorResult};
use folio_model::{FormatVersion, SectionTag};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

/// Folio configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo steps kept (0 = unlimited)
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,

    /// Same-action sessions closer together than this share an undo step
    #[serde(default = "default_undo_block_timeout_ms")]
    pub undo_block_timeout_ms: u64,

    /// Tag for synthesized paragraphs
    #[serde(default)]
    pub default_section_tag: SectionTag,

    /// Format used for snapshots and `Editor::serialize`
    #[serde(default)]
    pub serialization_version: FormatVersion,
}

fn default_undo_depth() -> usize {
    5
}

fn default_undo_block_timeout_ms() -> u64 {
    5000
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when the
    /// directory has no config file.
    pub fn load(dir: impl AsRef<Path>) -> EditorResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config = Self::from_json(&content)
                .map_err(|e| EditorError::Config(format!("{}: {}", config_path.display(), e)))?;
            info!(path = %config_path.display(), "Loaded editor config");
            Ok(config)
        } else {
            debug!(dir = %dir.as_ref().display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn undo_block_timeout(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.undo_block_timeout_ms).unwrap_or(i64::MAX))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            undo_depth: default_undo_depth(),
            undo_block_timeout_ms: default_undo_block_timeout_ms(),
            default_section_tag: SectionTag::default(),
            serialization_version: FormatVersion::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "undoDepth": 50,
            "undoBlockTimeoutMs": 250,
            "defaultSectionTag": "h2",
            "serializationVersion": "0.3.0"
        }"#;

        let config = EditorConfig::from_json(json).unwrap();
        assert_eq!(config.undo_depth, 50);
        assert_eq!(config.undo_block_timeout(), chrono::Duration::milliseconds(250));
        assert_eq!(config.default_section_tag, SectionTag::H2);
        assert_eq!(config.serialization_version, FormatVersion::V0_3_0);
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.undo_depth, 5);
        assert_eq!(config.undo_block_timeout_ms, 5000);
        assert_eq!(config.default_section_tag, SectionTag::P);
        assert_eq!(config.serialization_version, FormatVersion::V0_3_2);
    }

    #[test]
    fn test_rejects_unknown_values() {
        assert!(EditorConfig::from_json(r#"{"defaultSectionTag": "div"}"#).is_err());
        assert!(EditorConfig::from_json(r#"{"serializationVersion": "0.2.0"}"#).is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = std::env::temp_dir().join("folio-config-missing");
        let config = EditorConfig::load(&dir).unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
