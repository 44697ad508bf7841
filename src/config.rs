//! Rule configuration loaded per schema file

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
}

/// Source and destination directories, resolved against the base directory.
#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    #[serde(rename = "EADirectory")]
    pub ea_directory: String,
    #[serde(rename = "ReleaseDirectory")]
    pub release_directory: String,
}

/// The schema file this configuration applies to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSection {
    pub name: String,
    pub default_namespace: String,
}

/// One free-form attribute fixup: selects a single element by attribute
/// match and sets the comma-aligned attribute/value pairs on it.
#[derive(Debug, Clone, Deserialize)]
pub struct Adjustment {
    pub kind: String,
    pub value: String,
    pub attributes: String,
    pub values: String,
}

/// Selects the first element whose local name matches `element` and, when
/// given, whose `attribute` equals `value`.
#[derive(Debug, Clone, Deserialize)]
pub struct Selector {
    pub element: String,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Typed one-off edit primitives. A closed set: surgery that does not fit
/// here is a feature gap, not configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Edit {
    SetAttribute {
        select: Selector,
        name: String,
        value: String,
    },
    DeleteAttribute {
        select: Selector,
        name: String,
    },
    MoveSubtree {
        select: Selector,
        to: Selector,
    },
    CloneSubtree {
        select: Selector,
        to: Selector,
    },
}

/// Per-schema rule configuration.
///
/// `location` and `schema` are mandatory; every other section is optional
/// and an absent section skips the corresponding rule group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    pub location: Location,
    pub schema: SchemaSection,

    /// Required imports: prefix to "namespaceURI schemaLocation".
    #[serde(default)]
    pub imports: Option<BTreeMap<String, String>>,

    /// Required includes: arbitrary key to schemaLocation, ordered by key.
    #[serde(default)]
    pub includes: Option<BTreeMap<String, String>>,

    /// Elements allowed to keep their gml:AbstractFeature substitution group.
    #[serde(default, rename = "allowedGMLAbstractFeatures")]
    pub allowed_gml_abstract_features: Option<Vec<String>>,

    /// `type` attribute rewrites, old value to new value.
    #[serde(default)]
    pub data_types: Option<BTreeMap<String, String>>,

    /// Replacement types for code-list elements, keyed by element name.
    #[serde(default)]
    pub code_lists: Option<BTreeMap<String, String>>,

    /// `substitutionGroup` attribute rewrites, old value to new value.
    #[serde(default)]
    pub substitution_groups: Option<BTreeMap<String, String>>,

    /// `base` attribute rewrites on extension elements.
    #[serde(default)]
    pub base_extensions: Option<BTreeMap<String, String>>,

    /// Element names that must carry nillable="true".
    #[serde(default)]
    pub set_nil_attribute: Option<Vec<String>>,

    /// Documentation text for attribute declarations, keyed by attribute name.
    #[serde(default)]
    pub attribute_doc_strings: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub adjustments: Option<Vec<Adjustment>>,

    #[serde(default)]
    pub edits: Option<Vec<Edit>>,
}

impl RuleConfig {
    /// Load a rule configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
