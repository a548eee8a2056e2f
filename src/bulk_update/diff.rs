//! Field-level diff between a persisted title and one incoming row.

use super::fields::{TitleField, FIELD_MAPPINGS};
use super::models::{FieldValue, IncomingRow};
use crate::title_store::Title;
use serde::{Deserialize, Serialize};

/// One declared field's transition within a bulk update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldChange {
    /// Human label for display.
    pub label: String,
    /// Stable field identifier used for update targeting.
    pub field: TitleField,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

/// Result of comparing one persisted title against one incoming row.
///
/// Fields absent from the input appear in neither list, so
/// `changed_fields.len() + unchanged_fields.len() == fields_compared`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TitleDiff {
    pub changed_fields: Vec<FieldChange>,
    /// Labels of fields present in the input and equal to the persisted value.
    pub unchanged_fields: Vec<String>,
    pub fields_compared: usize,
}

/// Compute which declared fields differ between a persisted title and an
/// incoming row. Fields the row does not carry are skipped entirely; null,
/// empty and whitespace-only values compare as equal; list fields compare by
/// sorted-set equivalence.
pub fn compute_diff(existing: &Title, incoming: &IncomingRow) -> TitleDiff {
    let mut diff = TitleDiff::default();
    for mapping in FIELD_MAPPINGS {
        let Some(candidate) = incoming.get(mapping.field) else {
            continue;
        };
        diff.fields_compared += 1;
        let current = existing.field_value(mapping.field);
        if current.comparable() != candidate.comparable() {
            diff.changed_fields.push(FieldChange {
                label: mapping.label.to_string(),
                field: mapping.field,
                old_value: current.display(),
                new_value: candidate.display(),
            });
        } else {
            diff.unchanged_fields.push(mapping.label.to_string());
        }
    }
    diff
}
