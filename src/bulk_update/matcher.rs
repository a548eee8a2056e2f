//! Resolves incoming CSV rows against the tenant catalog by normalized ISBN.

use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use super::diff::compute_diff;
use super::isbn::normalize_isbn;
use super::models::{IncomingRow, MatchError, MatchResult, TitleMatch};
use crate::title_store::{Title, TitleStore};

/// Match a batch of incoming rows against the tenant's titles.
///
/// Every row resolves to exactly one of matched / unmatched / no_isbn; a
/// missing identifier or a not-found identifier is a result value, never an
/// error. Duplicate normalized ISBNs among persisted titles are surfaced as
/// matching-phase diagnostics; the first title in iteration order keeps the
/// lookup slot.
pub fn match_by_isbn(
    store: &dyn TitleStore,
    tenant_id: &str,
    rows: &[IncomingRow],
) -> Result<MatchResult> {
    let mut result = MatchResult::default();

    let mut with_isbn: Vec<(&IncomingRow, &str)> = Vec::new();
    for row in rows {
        match row.isbn.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(isbn) => with_isbn.push((row, isbn)),
            None => result.no_isbn.push(row.row_number),
        }
    }

    // Nothing to look up, skip the catalog scan entirely.
    if with_isbn.is_empty() {
        return Ok(result);
    }

    let titles = store.list_titles(tenant_id)?;
    let mut by_isbn: HashMap<String, &Title> = HashMap::with_capacity(titles.len());
    for title in &titles {
        let Some(raw) = title.isbn.as_deref().filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let key = normalize_isbn(raw);
        if let Some(kept) = by_isbn.get(&key) {
            result.errors.push(MatchError {
                isbn: Some(raw.to_string()),
                message: format!(
                    "duplicate ISBN in catalog: titles '{}' and '{}' both normalize to '{}'",
                    kept.id, title.id, key
                ),
            });
        } else {
            by_isbn.insert(key, title);
        }
    }

    for (row, isbn) in with_isbn {
        match by_isbn.get(&normalize_isbn(isbn)) {
            Some(title) => {
                let diff = compute_diff(title, row);
                let has_changes = !diff.changed_fields.is_empty();
                result.matches.push(TitleMatch {
                    isbn: isbn.to_string(),
                    title_id: title.id.clone(),
                    existing: (*title).clone(),
                    row: row.clone(),
                    diff,
                    has_changes,
                    row_number: row.row_number,
                    selected: has_changes,
                });
            }
            None => result.unmatched.push(isbn.to_string()),
        }
    }

    debug!(
        "Matched {} rows for tenant {}: {} unmatched, {} without ISBN, {} diagnostics",
        result.matches.len(),
        tenant_id,
        result.unmatched.len(),
        result.no_isbn.len(),
        result.errors.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk_update::fields::TitleField;
    use crate::bulk_update::models::FieldValue;
    use crate::title_store::{
        BulkApplyPlan, BulkApplyReport, ImportRecord, SqliteTitleStore,
    };

    fn seed_title(store: &SqliteTitleStore, tenant: &str, isbn: &str, name: &str) -> Title {
        let mut title = Title::new(tenant, name);
        title.isbn = Some(isbn.to_string());
        title.genre = Some("Fiction".to_string());
        store.insert_title(&title).unwrap();
        title
    }

    #[test]
    fn test_partition_completeness() {
        let store = SqliteTitleStore::in_memory().unwrap();
        seed_title(&store, "t1", "978-0-000000-0-1", "Known Book");

        let rows = vec![
            IncomingRow::new(1, Some("978-0-000000-0-1".to_string())),
            IncomingRow::new(2, Some("978-1-111111-1-1".to_string())),
            IncomingRow::new(3, None),
        ];
        let result = match_by_isbn(&store, "t1", &rows).unwrap();

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.unmatched, vec!["978-1-111111-1-1".to_string()]);
        assert_eq!(result.no_isbn, vec![3]);
        let total = result.matches.len() + result.unmatched.len() + result.no_isbn.len();
        assert_eq!(total, rows.len());
    }

    #[test]
    fn test_matching_ignores_identifier_formatting() {
        let store = SqliteTitleStore::in_memory().unwrap();
        seed_title(&store, "t1", "9780743273565", "Gatsby");

        let rows = vec![IncomingRow::new(1, Some(" 978-0-7432-7356-5 ".to_string()))];
        let result = match_by_isbn(&store, "t1", &rows).unwrap();

        assert_eq!(result.matches.len(), 1);
        // original form preserved, not the normalized one
        assert_eq!(result.matches[0].isbn, "978-0-7432-7356-5");
    }

    #[test]
    fn test_unchanged_and_changed_rows() {
        let store = SqliteTitleStore::in_memory().unwrap();
        seed_title(&store, "t1", "978-0-000000-0-1", "First Book");
        seed_title(&store, "t1", "978-0-000000-0-2", "Second Book");

        let mut row1 = IncomingRow::new(1, Some("978-0-000000-0-1".to_string()));
        row1.set(TitleField::Title, FieldValue::Text("First Book".to_string()));
        let mut row2 = IncomingRow::new(2, Some("978-0-000000-0-2".to_string()));
        row2.set(TitleField::Genre, FieldValue::Text("Mystery".to_string()));

        let result = match_by_isbn(&store, "t1", &[row1, row2]).unwrap();
        assert_eq!(result.matches.len(), 2);

        let m1 = result.matches.iter().find(|m| m.row_number == 1).unwrap();
        assert!(!m1.has_changes);
        assert!(!m1.selected);

        let m2 = result.matches.iter().find(|m| m.row_number == 2).unwrap();
        assert!(m2.has_changes);
        assert!(m2.selected);
        assert_eq!(m2.diff.changed_fields.len(), 1);
        assert_eq!(m2.diff.changed_fields[0].field, TitleField::Genre);
    }

    #[test]
    fn test_selected_implies_has_changes() {
        let store = SqliteTitleStore::in_memory().unwrap();
        seed_title(&store, "t1", "978-0-000000-0-1", "Book");

        let mut row = IncomingRow::new(1, Some("978-0-000000-0-1".to_string()));
        row.set(TitleField::Title, FieldValue::Text("Book".to_string()));

        let result = match_by_isbn(&store, "t1", &[row]).unwrap();
        for m in &result.matches {
            assert!(!m.selected || m.has_changes);
        }
    }

    #[test]
    fn test_tenants_never_cross_match() {
        let store = SqliteTitleStore::in_memory().unwrap();
        seed_title(&store, "other-tenant", "978-0-000000-0-1", "Their Book");

        let rows = vec![IncomingRow::new(1, Some("978-0-000000-0-1".to_string()))];
        let result = match_by_isbn(&store, "t1", &rows).unwrap();

        assert!(result.matches.is_empty());
        assert_eq!(result.unmatched, vec!["978-0-000000-0-1".to_string()]);
    }

    #[test]
    fn test_duplicate_catalog_isbn_raises_diagnostic() {
        let store = SqliteTitleStore::in_memory().unwrap();
        seed_title(&store, "t1", "978-0-000000-0-1", "Original");
        seed_title(&store, "t1", "978 0 000000 0 1", "Near Duplicate");

        let rows = vec![IncomingRow::new(1, Some("9780000000-01".to_string()))];
        let result = match_by_isbn(&store, "t1", &rows).unwrap();

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("duplicate ISBN"));
    }

    /// Store that fails every call, to prove the matcher short-circuits
    /// before touching the catalog when no row carries an identifier.
    struct UnreachableStore;

    impl TitleStore for UnreachableStore {
        fn list_titles(&self, _tenant_id: &str) -> Result<Vec<Title>> {
            anyhow::bail!("store must not be touched")
        }
        fn get_title(&self, _tenant_id: &str, _id: &str) -> Result<Option<Title>> {
            anyhow::bail!("store must not be touched")
        }
        fn insert_title(&self, _title: &Title) -> Result<()> {
            anyhow::bail!("store must not be touched")
        }
        fn bulk_apply(&self, _tenant_id: &str, _plan: &BulkApplyPlan) -> Result<BulkApplyReport> {
            anyhow::bail!("store must not be touched")
        }
        fn create_import_record(&self, _record: &ImportRecord) -> Result<()> {
            anyhow::bail!("store must not be touched")
        }
        fn get_import_record(&self, _tenant_id: &str, _id: &str) -> Result<Option<ImportRecord>> {
            anyhow::bail!("store must not be touched")
        }
        fn list_import_records(&self, _tenant_id: &str, _limit: usize) -> Result<Vec<ImportRecord>> {
            anyhow::bail!("store must not be touched")
        }
    }

    #[test]
    fn test_short_circuit_without_identifiers() {
        let rows = vec![IncomingRow::new(1, None), IncomingRow::new(2, Some("  ".to_string()))];
        let result = match_by_isbn(&UnreachableStore, "t1", &rows).unwrap();

        assert!(result.matches.is_empty());
        assert!(result.unmatched.is_empty());
        assert_eq!(result.no_isbn, vec![1, 2]);
    }
}
