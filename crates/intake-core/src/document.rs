//! Persisted pipeline document
//!
//! The JSON shape written to `pipeline.json`:
//!
//! ```json
//! {
//!   "doc": { "description": "...", "doc": "...", "contact": "..." },
//!   "steps": [
//!     { "module_config": {
//!         "title": "load-csv",
//!         "desc": "...",
//!         "inputs_schema":  { "default": { "type": "any", "optional": true, "doc": "..." } },
//!         "outputs_schema": { "default": { "type": "any", "optional": true, "doc": "..." } }
//!     } }
//!   ]
//! }
//! ```

use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize};

use crate::error::{MappingError, MappingResult};

/// Separates the workflow description from the research questions in `doc.doc`
pub const RESEARCH_QUESTIONS_DELIMITER: &str = "\n## Research Questions\n";

/// Value of `type` in every schema block
pub const ANY_TYPE: &str = "any";

/// Canonical serialized form of a workflow description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub doc: DocBlock,
    pub steps: Vec<StepEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocBlock {
    #[serde(default)]
    pub description: String,
    /// Description, delimiter, research questions
    pub doc: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntry {
    pub module_config: ModuleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub inputs_schema: SchemaBlock,
    pub outputs_schema: SchemaBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBlock {
    pub default: SchemaField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_optional", deserialize_with = "bool_or_string")]
    pub optional: bool,
    #[serde(default)]
    pub doc: String,
}

fn default_optional() -> bool {
    true
}

// Older documents carry `"optional": "true"`
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(de::Error::invalid_value(Unexpected::Str(&text), &"a boolean")),
        },
    }
}

impl SchemaBlock {
    /// The fixed `{default: {type: "any", optional: true, doc}}` block
    pub fn any(doc: impl Into<String>) -> Self {
        Self {
            default: SchemaField {
                kind: ANY_TYPE.to_string(),
                optional: true,
                doc: doc.into(),
            },
        }
    }

    pub fn doc(&self) -> &str {
        &self.default.doc
    }
}

impl PipelineDocument {
    /// Pretty-printed JSON with 2-space indentation
    pub fn to_pretty_json(&self) -> MappingResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse stored bytes into a [`PipelineDocument`].
///
/// Anything that is not valid JSON of the expected shape, including a
/// missing `doc` or `steps` key, is a [`MappingError::SchemaMismatch`].
pub fn parse_document(bytes: &[u8]) -> MappingResult<PipelineDocument> {
    serde_json::from_slice(bytes).map_err(|e| MappingError::SchemaMismatch(e.to_string()))
}
