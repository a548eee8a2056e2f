//! Data models for the bulk update flow.

use super::diff::TitleDiff;
use super::fields::{FieldKind, TitleField, FIELD_MAPPINGS};
use crate::title_store::Title;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A candidate value carried by an incoming CSV row.
///
/// Null, empty string and absent-from-input are three distinct states: Null
/// and "" compare as equal, while an absent field is skipped entirely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
    Null,
}

impl FieldValue {
    /// Comparison key: null becomes "", lists become a lexically sorted join,
    /// scalars become their trimmed string form.
    pub fn comparable(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::List(items) => {
                let mut entries: Vec<String> = items
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                entries.sort_unstable();
                entries.join(", ")
            }
        }
    }

    /// Display form for change reporting: lists are rendered as their
    /// canonical joined string, scalars pass through unchanged.
    pub fn display(&self) -> FieldValue {
        match self {
            FieldValue::List(_) => FieldValue::Text(self.comparable()),
            other => other.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.comparable().is_empty()
    }
}

/// Render a number without a trailing ".0" so 320 and "320" compare equal.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One already-validated input record from a CSV upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncomingRow {
    /// 1-based row number in the uploaded file, for user-facing errors.
    pub row_number: usize,
    /// Identifier as given in the upload, pre-normalization.
    pub isbn: Option<String>,
    /// Candidate values keyed by declared field. A missing key means the
    /// column was not present in the upload and must not be touched.
    #[serde(default)]
    pub fields: BTreeMap<TitleField, FieldValue>,
}

impl IncomingRow {
    pub fn new(row_number: usize, isbn: Option<String>) -> Self {
        Self {
            row_number,
            isbn,
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, field: TitleField, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn get(&self, field: TitleField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Build a typed row from raw CSV cells keyed by header name.
    ///
    /// Unknown columns are ignored; missing columns stay absent. Empty cells
    /// become Null, numeric cells that fail to parse keep their text form so
    /// the diff still has something visible to compare.
    pub fn from_raw(row_number: usize, cells: &BTreeMap<String, String>) -> Self {
        let isbn = cells
            .get("isbn")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let mut row = Self::new(row_number, isbn);
        for mapping in FIELD_MAPPINGS {
            if let Some(raw) = cells.get(mapping.csv_key) {
                row.fields.insert(mapping.field, parse_cell(mapping.kind, raw));
            }
        }
        row
    }
}

fn parse_cell(kind: FieldKind, raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValue::Null;
    }
    match kind {
        FieldKind::Text => FieldValue::Text(trimmed.to_string()),
        FieldKind::Number => trimmed
            .parse::<f64>()
            .map(FieldValue::Number)
            .unwrap_or_else(|_| FieldValue::Text(trimmed.to_string())),
        FieldKind::List => FieldValue::List(
            trimmed
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
    }
}

/// One resolved pairing between an incoming row and a persisted title.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TitleMatch {
    /// Identifier as given in the upload, pre-normalization.
    pub isbn: String,
    pub title_id: String,
    /// Snapshot of the persisted title at match time.
    pub existing: Title,
    pub row: IncomingRow,
    pub diff: TitleDiff,
    pub has_changes: bool,
    pub row_number: usize,
    /// Pre-selected when the diff is non-empty; the user may deselect.
    pub selected: bool,
}

/// A diagnostic raised during the matching phase, not tied to a single row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchError {
    pub isbn: Option<String>,
    pub message: String,
}

/// Batch outcome of matching incoming rows against the tenant catalog.
///
/// Every input row lands in exactly one of matches / unmatched / no_isbn.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatchResult {
    pub matches: Vec<TitleMatch>,
    /// Identifiers present in the input but not found in the catalog,
    /// in their original pre-normalization form.
    pub unmatched: Vec<String>,
    /// Row numbers that carried no identifier at all.
    pub no_isbn: Vec<usize>,
    pub errors: Vec<MatchError>,
}

/// A failure attributed to one input row during apply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RowError {
    pub row_number: usize,
    pub field: Option<String>,
    pub message: String,
}

/// Options for the apply step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BulkUpdateOptions {
    /// Create new titles for rows whose ISBN was not found in the catalog.
    #[serde(default)]
    pub create_unmatched: bool,
    #[serde(default)]
    pub unmatched_rows: Vec<IncomingRow>,
    /// Original upload filename, recorded on the import record.
    #[serde(default)]
    pub filename: Option<String>,
    /// Column mapping metadata, recorded on the import record.
    #[serde(default)]
    pub column_map: Option<serde_json::Value>,
}

/// Final outcome of one bulk update invocation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BulkUpdateResult {
    pub success: bool,
    pub updated_count: usize,
    pub created_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<RowError>,
    /// Tracking record id, when one could be written.
    pub import_id: Option<String>,
    pub updated_title_ids: Vec<String>,
    pub created_title_ids: Vec<String>,
}
