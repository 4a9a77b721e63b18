//! Target schema for taste extraction.
//!
//! The record shape is declared once, as a serde struct plus a field-spec
//! table. The table drives `format_instructions()`, so the text the model is
//! told to emit and the text `validate_and_parse` accepts can never drift
//! apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("model output is not a valid record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field '{field}' has {len} element(s), expected between {min} and {max}")]
    Cardinality {
        field: &'static str,
        len: usize,
        min: usize,
        max: usize,
    },
}

/// Declarative description of one schema field. Drives the format
/// instructions embedded in the prompt.
struct FieldSpec {
    name: &'static str,
    type_desc: &'static str,
    description: &'static str,
    cardinality: &'static str,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "genres",
        type_desc: "list of strings",
        description: "Music genres liked by the user.",
        cardinality: "If present, must contain between 1 and 5 elements.",
    },
    FieldSpec {
        name: "bands",
        type_desc: "list of strings",
        description: "Specific bands or artists liked by the user.",
        cardinality: "If present, must contain between 1 and 5 elements.",
    },
    FieldSpec {
        name: "albums",
        type_desc: "list of strings",
        description: "Specific albums liked by the user.",
        cardinality: "If present, must contain between 1 and 5 elements.",
    },
    FieldSpec {
        name: "year_range",
        type_desc: "list of integers",
        description: "Year range of music liked by the user.",
        cardinality: "If present, must contain exactly 2 elements, the start and end year.",
    },
];

/// The structured taste record extracted from a free-text query.
///
/// Every field is independently optional. Absent fields serialize as omitted
/// keys; on input an explicit JSON `null` also maps to absent. Unknown keys
/// in model output are ignored. `year_range` ordering is NOT checked — the
/// schema constrains cardinality only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicTasteRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albums: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_range: Option<Vec<i32>>,
}

impl MusicTasteRecord {
    /// Parses raw completion text into a validated record.
    ///
    /// Markdown code fences are stripped first (models wrap JSON in them
    /// despite instructions), then the text must deserialize into the record
    /// shape, then every present field must satisfy its cardinality bound.
    /// A present-but-malformed field is a hard failure, never coerced.
    pub fn validate_and_parse(raw: &str) -> Result<Self, SchemaError> {
        let text = strip_json_fences(raw);
        let record: Self = serde_json::from_str(text)?;
        record.validate()?;
        Ok(record)
    }

    /// Compact JSON wire form, used to serialize the worked examples.
    pub fn to_wire(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        check_len("genres", &self.genres, 1, 5)?;
        check_len("bands", &self.bands, 1, 5)?;
        check_len("albums", &self.albums, 1, 5)?;
        check_len("year_range", &self.year_range, 2, 2)?;
        Ok(())
    }

    /// Textual description of the expected output format, generated from the
    /// field-spec table. Deterministic; embedded verbatim in the prompt.
    pub fn format_instructions() -> String {
        let mut out = String::from(
            "Respond with a single JSON object and nothing else.\n\
             The object may contain the following keys. Omit a key entirely \
             when the query gives no evidence for it.\n",
        );
        for field in FIELDS {
            out.push_str(&format!(
                "- \"{}\" ({}): {} {}\n",
                field.name, field.type_desc, field.description, field.cardinality
            ));
        }
        out.push_str(r#"Example shape: {"genres": ["rock"], "year_range": [1970, 1979]}"#);
        out
    }
}

fn check_len<T>(
    field: &'static str,
    value: &Option<Vec<T>>,
    min: usize,
    max: usize,
) -> Result<(), SchemaError> {
    if let Some(items) = value {
        let len = items.len();
        if len < min || len > max {
            return Err(SchemaError::Cardinality {
                field,
                len,
                min,
                max,
            });
        }
    }
    Ok(())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from completion output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
