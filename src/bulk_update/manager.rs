//! Orchestrates the match and apply phases of a bulk CSV update.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use super::matcher::match_by_isbn;
use super::models::{
    BulkUpdateOptions, BulkUpdateResult, FieldValue, IncomingRow, MatchResult, RowError,
    TitleMatch,
};
use crate::title_store::{BulkApplyPlan, ImportRecord, ImportStatus, RowCreate, RowUpdate, TitleStore};

/// Entry point for bulk CSV reconciliation against a tenant's catalog.
pub struct BulkUpdateManager {
    store: Arc<dyn TitleStore>,
}

impl BulkUpdateManager {
    pub fn new(store: Arc<dyn TitleStore>) -> Self {
        Self { store }
    }

    /// Resolve a batch of incoming rows against the tenant catalog.
    pub fn match_rows(&self, tenant_id: &str, rows: &[IncomingRow]) -> Result<MatchResult> {
        match_by_isbn(self.store.as_ref(), tenant_id, rows)
    }

    /// Apply the selected matches (and optionally create unmatched rows) in
    /// one transaction.
    ///
    /// This never returns Err: row-level failures are carried in the result,
    /// and a transaction-level failure is reported as an unsuccessful result
    /// with a best-effort "failed" import record left behind.
    pub fn apply_bulk_update(
        &self,
        tenant_id: &str,
        matches: &[TitleMatch],
        options: &BulkUpdateOptions,
    ) -> BulkUpdateResult {
        let plan = build_plan(matches, options);
        let total_rows = plan.total_rows;

        match self.store.bulk_apply(tenant_id, &plan) {
            Ok(report) => {
                let success = report.errors.is_empty();
                info!(
                    "Bulk update for tenant {}: {} updated, {} created, {} skipped, {} errors",
                    tenant_id,
                    report.updated_title_ids.len(),
                    report.created_title_ids.len(),
                    plan.skipped_count,
                    report.errors.len()
                );
                BulkUpdateResult {
                    success,
                    updated_count: report.updated_title_ids.len(),
                    created_count: report.created_title_ids.len(),
                    skipped_count: plan.skipped_count,
                    errors: report.errors,
                    import_id: Some(report.import_id),
                    updated_title_ids: report.updated_title_ids,
                    created_title_ids: report.created_title_ids,
                }
            }
            Err(e) => {
                warn!("Bulk update transaction failed for tenant {}: {:#}", tenant_id, e);
                let import_id = self.record_failure(tenant_id, options, total_rows, &e);
                BulkUpdateResult {
                    success: false,
                    updated_count: 0,
                    created_count: 0,
                    skipped_count: 0,
                    errors: vec![RowError {
                        row_number: 0,
                        field: None,
                        message: format!("bulk update failed: {:#}", e),
                    }],
                    import_id,
                    updated_title_ids: Vec::new(),
                    created_title_ids: Vec::new(),
                }
            }
        }
    }

    /// Leave a standalone failed import record after an aborted transaction.
    /// Best effort: if even this write fails the result simply carries no
    /// import id.
    fn record_failure(
        &self,
        tenant_id: &str,
        options: &BulkUpdateOptions,
        total_rows: usize,
        error: &anyhow::Error,
    ) -> Option<String> {
        let mut record = ImportRecord::new(
            tenant_id,
            options.filename.clone(),
            options.column_map.clone(),
            total_rows as i64,
        );
        record.status = ImportStatus::Failed;
        record.error_message = Some(format!("{:#}", error));
        record.completed_at = Some(chrono::Utc::now().timestamp_millis());
        match self.store.create_import_record(&record) {
            Ok(()) => Some(record.id),
            Err(e) => {
                warn!("Failed to record failed import for tenant {}: {:#}", tenant_id, e);
                None
            }
        }
    }
}

/// Turn the selection into a transactional plan.
///
/// A match contributes an update only when it is selected and its diff is
/// non-empty; everything else counts as skipped. Updates carry the incoming
/// row's original values so list fields keep their structure.
fn build_plan(matches: &[TitleMatch], options: &BulkUpdateOptions) -> BulkApplyPlan {
    let mut plan = BulkApplyPlan {
        filename: options.filename.clone(),
        column_map: options.column_map.clone(),
        ..Default::default()
    };

    for m in matches {
        if !m.selected || m.diff.changed_fields.is_empty() {
            plan.skipped_count += 1;
            continue;
        }
        let sets: Vec<(_, FieldValue)> = m
            .diff
            .changed_fields
            .iter()
            .map(|change| {
                let value = m
                    .row
                    .get(change.field)
                    .cloned()
                    .unwrap_or_else(|| change.new_value.clone());
                (change.field, value)
            })
            .collect();
        plan.updates.push(RowUpdate {
            row_number: m.row_number,
            title_id: m.title_id.clone(),
            isbn: m.isbn.clone(),
            sets,
            changes: m.diff.changed_fields.clone(),
        });
    }

    if options.create_unmatched {
        for row in &options.unmatched_rows {
            plan.creates.push(RowCreate {
                row_number: row.row_number,
                isbn: row.isbn.clone().unwrap_or_default(),
                fields: row
                    .fields
                    .iter()
                    .map(|(field, value)| (*field, value.clone()))
                    .collect(),
            });
        }
    }

    plan.total_rows = matches.len() + plan.creates.len();
    plan
}
