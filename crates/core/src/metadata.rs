//! Per-title metadata
//!
//! Every title carries a `metadata.json` describing how its HTML shell and
//! icons are generated, plus the set of localizations its packages may scope
//! files to. The parsed snapshot is persisted in the build state so that
//! deleting a title (or a localization) can cascade using the *old* list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BuildError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    pub name: String,
    pub url: String,
}

/// Display metadata for one localization of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationMetadata {
    /// Localized display name.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleMetadata {
    pub name: String,
    pub description: String,
    pub developer: Developer,
    pub width: u32,
    pub height: u32,
    /// Localization name -> display metadata. Independent of package/file
    /// structure, but referenced by it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub localizations: BTreeMap<String, LocalizationMetadata>,
}

impl TitleMetadata {
    /// Parses a title's `metadata.json`, mapping any failure (including a
    /// literal `null` document) to a configuration error for that title.
    pub fn parse(text: &str, title: &str) -> Result<Self, BuildError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|error| BuildError::config(title, format!("metadata.json: {error}")))?;
        if value.is_null() {
            return Err(BuildError::config(title, "metadata.json contains null"));
        }
        serde_json::from_value(value)
            .map_err(|error| BuildError::config(title, format!("metadata.json: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "name": "Pond",
        "description": "A tiny fishing game",
        "developer": { "name": "dev", "url": "https://example.com" },
        "width": 320,
        "height": 240,
        "localizations": {
            "fr": { "name": "Étang" }
        }
    }"#;

    #[test]
    fn parses_full_metadata() {
        let meta = TitleMetadata::parse(FULL, "pond").unwrap();
        assert_eq!(meta.name, "Pond");
        assert_eq!(meta.width, 320);
        assert_eq!(meta.localizations["fr"].name, "Étang");
    }

    #[test]
    fn localizations_default_to_empty() {
        let meta = TitleMetadata::parse(
            r#"{
                "name": "Pond",
                "description": "d",
                "developer": { "name": "n", "url": "u" },
                "width": 1,
                "height": 1
            }"#,
            "pond",
        )
        .unwrap();
        assert!(meta.localizations.is_empty());
    }

    #[test]
    fn null_document_is_config_error() {
        let error = TitleMetadata::parse("null", "pond").unwrap_err();
        assert!(matches!(error, BuildError::Config { .. }));
    }

    #[test]
    fn invalid_json_is_config_error() {
        let error = TitleMetadata::parse("{", "pond").unwrap_err();
        assert!(matches!(error, BuildError::Config { .. }));
    }

    #[test]
    fn snapshot_round_trips_through_state_json() {
        let meta = TitleMetadata::parse(FULL, "pond").unwrap();
        let json = serde_json::to_string(&meta).unwrap();
        let parsed: TitleMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, meta);
    }
}
