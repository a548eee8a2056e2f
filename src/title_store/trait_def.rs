//! TitleStore trait definition.

use super::models::{BulkApplyPlan, BulkApplyReport, ImportRecord, Title};
use anyhow::Result;

/// Trait for title catalog storage backends.
pub trait TitleStore: Send + Sync {
    // =========================================================================
    // Title Operations
    // =========================================================================

    /// Get every title belonging to a tenant.
    fn list_titles(&self, tenant_id: &str) -> Result<Vec<Title>>;

    /// Get a title by id, scoped to the tenant.
    fn get_title(&self, tenant_id: &str, id: &str) -> Result<Option<Title>>;

    /// Insert a new title.
    fn insert_title(&self, title: &Title) -> Result<()>;

    // =========================================================================
    // Bulk Apply
    // =========================================================================

    /// Apply a bulk update plan inside one transaction: create a provisional
    /// import record, run the partial updates and upsert creates, finalize
    /// the record and commit. Row-level validation failures are collected in
    /// the report; a store-level error rolls back the whole batch.
    fn bulk_apply(&self, tenant_id: &str, plan: &BulkApplyPlan) -> Result<BulkApplyReport>;

    // =========================================================================
    // Import Records
    // =========================================================================

    /// Write a standalone import record, outside any bulk transaction.
    /// Used to leave a "failed" trace when the transaction itself aborted.
    fn create_import_record(&self, record: &ImportRecord) -> Result<()>;

    /// Get an import record by id, scoped to the tenant.
    fn get_import_record(&self, tenant_id: &str, id: &str) -> Result<Option<ImportRecord>>;

    /// List a tenant's import records, most recent first.
    fn list_import_records(&self, tenant_id: &str, limit: usize) -> Result<Vec<ImportRecord>>;
}
