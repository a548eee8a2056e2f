//! Models for the title catalog and import tracking.

use crate::bulk_update::{FieldChange, FieldValue, RowError, TitleField};
use serde::{Deserialize, Serialize};

/// A catalog title, scoped to a tenant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Title {
    pub id: String,
    pub tenant_id: String,
    /// External identifier used for CSV matching. Stored as given; matching
    /// normalizes on the fly.
    pub isbn: Option<String>,
    pub title: String,
    pub subtitle: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub publication_date: Option<String>,
    pub page_count: Option<i64>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub bisac_codes: Vec<String>,
    pub keywords: Vec<String>,
    /// Unix milliseconds.
    pub created_at: i64,
    pub updated_at: i64,
}

impl Title {
    pub fn new<S: Into<String>, N: Into<String>>(tenant_id: S, name: N) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            isbn: None,
            title: name.into(),
            subtitle: None,
            genre: None,
            language: None,
            publication_date: None,
            page_count: None,
            price: None,
            description: None,
            bisac_codes: Vec::new(),
            keywords: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Read one declared field as a comparable value.
    pub fn field_value(&self, field: TitleField) -> FieldValue {
        match field {
            TitleField::Title => FieldValue::Text(self.title.clone()),
            TitleField::Subtitle => opt_text(&self.subtitle),
            TitleField::Genre => opt_text(&self.genre),
            TitleField::Language => opt_text(&self.language),
            TitleField::PublicationDate => opt_text(&self.publication_date),
            TitleField::PageCount => self
                .page_count
                .map(|n| FieldValue::Number(n as f64))
                .unwrap_or(FieldValue::Null),
            TitleField::Price => self.price.map(FieldValue::Number).unwrap_or(FieldValue::Null),
            TitleField::Description => opt_text(&self.description),
            TitleField::BisacCodes => FieldValue::List(self.bisac_codes.clone()),
            TitleField::Keywords => FieldValue::List(self.keywords.clone()),
        }
    }

    /// Write one declared field from a candidate value, coercing leniently.
    pub fn apply_field(&mut self, field: TitleField, value: &FieldValue) {
        match field {
            TitleField::Title => {
                if let Some(text) = as_text(value) {
                    self.title = text;
                }
            }
            TitleField::Subtitle => self.subtitle = as_text(value),
            TitleField::Genre => self.genre = as_text(value),
            TitleField::Language => self.language = as_text(value),
            TitleField::PublicationDate => self.publication_date = as_text(value),
            TitleField::PageCount => self.page_count = as_number(value).map(|n| n as i64),
            TitleField::Price => self.price = as_number(value),
            TitleField::Description => self.description = as_text(value),
            TitleField::BisacCodes => self.bisac_codes = as_list(value),
            TitleField::Keywords => self.keywords = as_list(value),
        }
    }
}

fn opt_text(value: &Option<String>) -> FieldValue {
    value
        .as_ref()
        .map(|s| FieldValue::Text(s.clone()))
        .unwrap_or(FieldValue::Null)
}

fn as_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        FieldValue::Number(n) => Some(FieldValue::Number(*n).comparable()),
        FieldValue::List(_) => Some(value.comparable()),
        FieldValue::Null => None,
    }
}

fn as_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) => Some(*n),
        FieldValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_list(value: &FieldValue) -> Vec<String> {
    match value {
        FieldValue::List(items) => items
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        FieldValue::Text(s) => s
            .split(';')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Status of a bulk import tracking record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Success,
    Partial,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Success => "success",
            ImportStatus::Partial => "partial",
            ImportStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ImportStatus::Pending),
            "success" => Some(ImportStatus::Success),
            "partial" => Some(ImportStatus::Partial),
            "failed" => Some(ImportStatus::Failed),
            _ => None,
        }
    }
}

/// Tracking record correlating one bulk update invocation with its outcome.
///
/// Created provisionally before any catalog mutation so every attempted bulk
/// operation stays traceable, then finalized with counts and the field-level
/// change payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRecord {
    pub id: String,
    pub tenant_id: String,
    pub filename: Option<String>,
    /// Column mapping metadata as captured from the upload flow.
    pub column_map: Option<serde_json::Value>,
    pub status: ImportStatus,
    pub total_rows: i64,
    pub updated_count: i64,
    pub created_count: i64,
    pub skipped_count: i64,
    pub error_count: i64,
    /// Field-level change payload, one entry per updated title.
    pub changes: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

impl ImportRecord {
    pub fn new(
        tenant_id: &str,
        filename: Option<String>,
        column_map: Option<serde_json::Value>,
        total_rows: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            filename,
            column_map,
            status: ImportStatus::Pending,
            total_rows,
            updated_count: 0,
            created_count: 0,
            skipped_count: 0,
            error_count: 0,
            changes: None,
            error_message: None,
            created_at: chrono::Utc::now().timestamp_millis(),
            completed_at: None,
        }
    }
}

/// One title's partial update within a bulk apply.
#[derive(Clone, Debug)]
pub struct RowUpdate {
    pub row_number: usize,
    pub title_id: String,
    /// Original identifier, recorded in the audit payload.
    pub isbn: String,
    /// Changed columns only; fields absent from the input never appear here.
    pub sets: Vec<(TitleField, FieldValue)>,
    /// The field changes being applied, for the audit payload.
    pub changes: Vec<FieldChange>,
}

/// A new title to create for an unmatched row (upsert mode).
#[derive(Clone, Debug)]
pub struct RowCreate {
    pub row_number: usize,
    /// Identifier in its post-validation form, stored as given.
    pub isbn: String,
    pub fields: Vec<(TitleField, FieldValue)>,
}

/// Everything the store needs to run one bulk update transaction.
#[derive(Clone, Debug, Default)]
pub struct BulkApplyPlan {
    pub filename: Option<String>,
    pub column_map: Option<serde_json::Value>,
    pub total_rows: usize,
    /// Matches excluded before the transaction (unselected or no-op).
    pub skipped_count: usize,
    pub updates: Vec<RowUpdate>,
    pub creates: Vec<RowCreate>,
}

/// Outcome of one committed bulk apply transaction.
#[derive(Clone, Debug)]
pub struct BulkApplyReport {
    pub import_id: String,
    pub updated_title_ids: Vec<String>,
    pub created_title_ids: Vec<String>,
    pub errors: Vec<RowError>,
}
