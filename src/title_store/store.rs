//! SQLite-backed title store implementation.

use super::models::{
    BulkApplyPlan, BulkApplyReport, ImportRecord, ImportStatus, RowCreate, Title,
};
use super::schema::TITLE_SCHEMA_SQL;
use super::trait_def::TitleStore;
use crate::bulk_update::{FieldKind, FieldValue, RowError, TitleField, mapping_for};
use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// SQLite implementation of TitleStore.
pub struct SqliteTitleStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTitleStore {
    /// Open or create a title database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open title database: {:?}", path))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on title database")?;
        conn.execute_batch(TITLE_SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(TITLE_SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_title(row: &rusqlite::Row) -> rusqlite::Result<Title> {
        Ok(Title {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            isbn: row.get("isbn")?,
            title: row.get("title")?,
            subtitle: row.get("subtitle")?,
            genre: row.get("genre")?,
            language: row.get("language")?,
            publication_date: row.get("publication_date")?,
            page_count: row.get("page_count")?,
            price: row.get("price")?,
            description: row.get("description")?,
            bisac_codes: parse_json_list(row.get("bisac_codes")?),
            keywords: parse_json_list(row.get("keywords")?),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn row_to_import(row: &rusqlite::Row) -> rusqlite::Result<ImportRecord> {
        Ok(ImportRecord {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            filename: row.get("filename")?,
            column_map: parse_json_value(row.get("column_map")?),
            status: ImportStatus::parse(&row.get::<_, String>("status")?)
                .unwrap_or(ImportStatus::Pending),
            total_rows: row.get("total_rows")?,
            updated_count: row.get("updated_count")?,
            created_count: row.get("created_count")?,
            skipped_count: row.get("skipped_count")?,
            error_count: row.get("error_count")?,
            changes: parse_json_value(row.get("changes")?),
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
            completed_at: row.get("completed_at")?,
        })
    }

    fn insert_title_tx(conn: &Connection, title: &Title) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO titles (
                id, tenant_id, isbn, title, subtitle, genre, language,
                publication_date, page_count, price, description,
                bisac_codes, keywords, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15
            )
            "#,
            params![
                title.id,
                title.tenant_id,
                title.isbn,
                title.title,
                title.subtitle,
                title.genre,
                title.language,
                title.publication_date,
                title.page_count,
                title.price,
                title.description,
                json_list(&title.bisac_codes),
                json_list(&title.keywords),
                title.created_at,
                title.updated_at,
            ],
        )
    }

    fn insert_import_record_tx(conn: &Connection, record: &ImportRecord) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO import_records (
                id, tenant_id, filename, column_map, status,
                total_rows, updated_count, created_count, skipped_count, error_count,
                changes, error_message, created_at, completed_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14
            )
            "#,
            params![
                record.id,
                record.tenant_id,
                record.filename,
                record.column_map.as_ref().map(|v| v.to_string()),
                record.status.as_str(),
                record.total_rows,
                record.updated_count,
                record.created_count,
                record.skipped_count,
                record.error_count,
                record.changes.as_ref().map(|v| v.to_string()),
                record.error_message,
                record.created_at,
                record.completed_at,
            ],
        )
    }
}

// Helper: serialize a string list to a JSON TEXT column
fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

// Helper: deserialize a JSON TEXT column to a string list
fn parse_json_list(raw: Option<String>) -> Vec<String> {
    raw.map(|json| {
        serde_json::from_str(&json).unwrap_or_else(|e| {
            warn!("Malformed JSON list in title db: {}: {}", json, e);
            Vec::new()
        })
    })
    .unwrap_or_default()
}

// Helper: deserialize an optional JSON TEXT column
fn parse_json_value(raw: Option<String>) -> Option<serde_json::Value> {
    raw.and_then(|json| {
        serde_json::from_str(&json)
            .map_err(|e| warn!("Malformed JSON in title db: {}: {}", json, e))
            .ok()
    })
}

/// Coerce a candidate value into the SQL form of its target column.
/// A kind mismatch is an application-level rejection, not a store failure.
fn sql_value(field: TitleField, value: &FieldValue) -> std::result::Result<SqlValue, String> {
    let kind = mapping_for(field)
        .map(|m| m.kind)
        .ok_or_else(|| format!("unknown field '{}'", field.as_str()))?;

    if matches!(value, FieldValue::Null) {
        return Ok(SqlValue::Null);
    }

    match kind {
        FieldKind::Text => match value {
            FieldValue::Text(s) => Ok(SqlValue::Text(s.trim().to_string())),
            FieldValue::Number(_) | FieldValue::List(_) => Ok(SqlValue::Text(value.comparable())),
            FieldValue::Null => Ok(SqlValue::Null),
        },
        FieldKind::Number => {
            let parsed = match value {
                FieldValue::Number(n) => Some(*n),
                FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let n = parsed.ok_or_else(|| {
                format!("'{}' expects a numeric value", field.as_str())
            })?;
            match field {
                TitleField::PageCount => Ok(SqlValue::Integer(n as i64)),
                _ => Ok(SqlValue::Real(n)),
            }
        }
        FieldKind::List => match value {
            FieldValue::List(items) => Ok(SqlValue::Text(json_list(items))),
            FieldValue::Text(s) => {
                let items: Vec<String> = s
                    .split(';')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect();
                Ok(SqlValue::Text(json_list(&items)))
            }
            _ => Err(format!("'{}' expects a list value", field.as_str())),
        },
    }
}

/// Build a new title from an upsert create payload.
/// Returns a user-facing message when the payload cannot form a valid title.
fn build_title(tenant_id: &str, create: &RowCreate) -> std::result::Result<Title, String> {
    if create.isbn.trim().is_empty() {
        return Err("cannot create a title without an ISBN".to_string());
    }
    let name = create
        .fields
        .iter()
        .find(|(field, _)| *field == TitleField::Title)
        .and_then(|(_, value)| match value {
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        })
        .ok_or_else(|| "cannot create a title without a title name".to_string())?;

    let mut title = Title::new(tenant_id, name);
    title.isbn = Some(create.isbn.trim().to_string());
    for (field, value) in &create.fields {
        if *field == TitleField::Title {
            continue;
        }
        title.apply_field(*field, value);
    }
    Ok(title)
}

impl TitleStore for SqliteTitleStore {
    fn list_titles(&self, tenant_id: &str) -> Result<Vec<Title>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT * FROM titles WHERE tenant_id = ?1 ORDER BY created_at ASC",
        )?;
        let titles = stmt
            .query_map(params![tenant_id], Self::row_to_title)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(titles)
    }

    fn get_title(&self, tenant_id: &str, id: &str) -> Result<Option<Title>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT * FROM titles WHERE tenant_id = ?1 AND id = ?2",
                params![tenant_id, id],
                Self::row_to_title,
            )
            .optional()?;
        Ok(result)
    }

    fn insert_title(&self, title: &Title) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_title_tx(&conn, title)?;
        Ok(())
    }

    fn bulk_apply(&self, tenant_id: &str, plan: &BulkApplyPlan) -> Result<BulkApplyReport> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Provisional tracking record first, so the operation is traceable
        // before any catalog mutation.
        let mut record = ImportRecord::new(
            tenant_id,
            plan.filename.clone(),
            plan.column_map.clone(),
            plan.total_rows as i64,
        );
        record.skipped_count = plan.skipped_count as i64;
        Self::insert_import_record_tx(&tx, &record)?;

        let mut errors: Vec<RowError> = Vec::new();
        let mut updated_title_ids: Vec<String> = Vec::new();
        let mut created_title_ids: Vec<String> = Vec::new();
        let mut change_payload: Vec<serde_json::Value> = Vec::new();
        let now = chrono::Utc::now().timestamp_millis();

        for update in &plan.updates {
            // Coerce every changed value before touching the row, so a bad
            // cell rejects the row without threatening the transaction.
            let mut values: Vec<SqlValue> = Vec::with_capacity(update.sets.len() + 3);
            let mut assignments: Vec<String> = Vec::with_capacity(update.sets.len() + 1);
            let mut rejected = false;
            for (field, value) in &update.sets {
                match sql_value(*field, value) {
                    Ok(sql) => {
                        assignments.push(format!("{} = ?", field.column()));
                        values.push(sql);
                    }
                    Err(message) => {
                        errors.push(RowError {
                            row_number: update.row_number,
                            field: Some(field.as_str().to_string()),
                            message,
                        });
                        rejected = true;
                        break;
                    }
                }
            }
            if rejected {
                continue;
            }
            if assignments.is_empty() {
                errors.push(RowError {
                    row_number: update.row_number,
                    field: None,
                    message: "no changed fields to apply".to_string(),
                });
                continue;
            }

            assignments.push("updated_at = ?".to_string());
            values.push(SqlValue::Integer(now));
            values.push(SqlValue::Text(update.title_id.clone()));
            values.push(SqlValue::Text(tenant_id.to_string()));

            let sql = format!(
                "UPDATE titles SET {} WHERE id = ? AND tenant_id = ?",
                assignments.join(", ")
            );
            let affected = tx.execute(&sql, params_from_iter(values))?;
            if affected == 0 {
                errors.push(RowError {
                    row_number: update.row_number,
                    field: None,
                    message: format!("title '{}' not found for tenant", update.title_id),
                });
                continue;
            }

            change_payload.push(serde_json::json!({
                "title_id": update.title_id,
                "isbn": update.isbn,
                "changes": update.changes,
            }));
            updated_title_ids.push(update.title_id.clone());
        }

        for create in &plan.creates {
            match build_title(tenant_id, create) {
                Ok(title) => {
                    Self::insert_title_tx(&tx, &title)?;
                    created_title_ids.push(title.id);
                }
                Err(message) => {
                    errors.push(RowError {
                        row_number: create.row_number,
                        field: None,
                        message,
                    });
                }
            }
        }

        let status = if errors.is_empty() {
            ImportStatus::Success
        } else {
            ImportStatus::Partial
        };
        tx.execute(
            r#"
            UPDATE import_records SET
                status = ?2, updated_count = ?3, created_count = ?4,
                skipped_count = ?5, error_count = ?6, changes = ?7, completed_at = ?8
            WHERE id = ?1
            "#,
            params![
                record.id,
                status.as_str(),
                updated_title_ids.len() as i64,
                created_title_ids.len() as i64,
                plan.skipped_count as i64,
                errors.len() as i64,
                serde_json::Value::Array(change_payload).to_string(),
                chrono::Utc::now().timestamp_millis(),
            ],
        )?;

        tx.commit()?;
        Ok(BulkApplyReport {
            import_id: record.id,
            updated_title_ids,
            created_title_ids,
            errors,
        })
    }

    fn create_import_record(&self, record: &ImportRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_import_record_tx(&conn, record)?;
        Ok(())
    }

    fn get_import_record(&self, tenant_id: &str, id: &str) -> Result<Option<ImportRecord>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT * FROM import_records WHERE tenant_id = ?1 AND id = ?2",
                params![tenant_id, id],
                Self::row_to_import,
            )
            .optional()?;
        Ok(result)
    }

    fn list_import_records(&self, tenant_id: &str, limit: usize) -> Result<Vec<ImportRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT * FROM import_records WHERE tenant_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let records = stmt
            .query_map(params![tenant_id, limit as i64], Self::row_to_import)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk_update::FieldChange;
    use super::super::models::RowUpdate;

    fn seed_title(store: &SqliteTitleStore, tenant: &str, isbn: &str, name: &str) -> Title {
        let mut title = Title::new(tenant, name);
        title.isbn = Some(isbn.to_string());
        title.genre = Some("Fiction".to_string());
        title.page_count = Some(200);
        store.insert_title(&title).unwrap();
        title
    }

    fn genre_update(title: &Title, row_number: usize, new_genre: &str) -> RowUpdate {
        RowUpdate {
            row_number,
            title_id: title.id.clone(),
            isbn: title.isbn.clone().unwrap_or_default(),
            sets: vec![(TitleField::Genre, FieldValue::Text(new_genre.to_string()))],
            changes: vec![FieldChange {
                label: "Genre".to_string(),
                field: TitleField::Genre,
                old_value: FieldValue::Text("Fiction".to_string()),
                new_value: FieldValue::Text(new_genre.to_string()),
            }],
        }
    }

    #[test]
    fn test_title_crud_is_tenant_scoped() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let title = seed_title(&store, "t1", "978-0-000000-0-1", "Book");

        assert!(store.get_title("t1", &title.id).unwrap().is_some());
        assert!(store.get_title("t2", &title.id).unwrap().is_none());
        assert_eq!(store.list_titles("t1").unwrap().len(), 1);
        assert!(store.list_titles("t2").unwrap().is_empty());
    }

    #[test]
    fn test_list_fields_roundtrip_through_json_columns() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let mut title = Title::new("t1", "Book");
        title.bisac_codes = vec!["FIC019000".to_string(), "FIC004000".to_string()];
        title.keywords = vec!["jazz age".to_string()];
        store.insert_title(&title).unwrap();

        let loaded = store.get_title("t1", &title.id).unwrap().unwrap();
        assert_eq!(loaded.bisac_codes, title.bisac_codes);
        assert_eq!(loaded.keywords, title.keywords);
    }

    #[test]
    fn test_bulk_apply_updates_only_changed_fields() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let title = seed_title(&store, "t1", "978-0-000000-0-1", "Book");

        let plan = BulkApplyPlan {
            total_rows: 1,
            updates: vec![genre_update(&title, 1, "Mystery")],
            ..Default::default()
        };
        let report = store.bulk_apply("t1", &plan).unwrap();
        assert_eq!(report.updated_title_ids, vec![title.id.clone()]);
        assert!(report.errors.is_empty());

        let loaded = store.get_title("t1", &title.id).unwrap().unwrap();
        assert_eq!(loaded.genre.as_deref(), Some("Mystery"));
        // untouched fields survive
        assert_eq!(loaded.title, "Book");
        assert_eq!(loaded.page_count, Some(200));
        assert!(loaded.updated_at >= title.updated_at);
    }

    #[test]
    fn test_bulk_apply_finalizes_import_record() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let title = seed_title(&store, "t1", "978-0-000000-0-1", "Book");

        let plan = BulkApplyPlan {
            filename: Some("titles.csv".to_string()),
            total_rows: 2,
            skipped_count: 1,
            updates: vec![genre_update(&title, 1, "Mystery")],
            ..Default::default()
        };
        let report = store.bulk_apply("t1", &plan).unwrap();

        let record = store
            .get_import_record("t1", &report.import_id)
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ImportStatus::Success);
        assert_eq!(record.filename.as_deref(), Some("titles.csv"));
        assert_eq!(record.total_rows, 2);
        assert_eq!(record.updated_count, 1);
        assert_eq!(record.skipped_count, 1);
        assert_eq!(record.error_count, 0);
        assert!(record.completed_at.is_some());

        let changes = record.changes.unwrap();
        let entries = changes.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["title_id"], title.id);
        assert_eq!(entries[0]["isbn"], "978-0-000000-0-1");
        assert_eq!(entries[0]["changes"][0]["field"], "genre");
    }

    #[test]
    fn test_bulk_apply_missing_title_is_a_row_error() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let title = seed_title(&store, "t1", "978-0-000000-0-1", "Book");

        let mut ghost = genre_update(&title, 2, "Mystery");
        ghost.title_id = "no-such-id".to_string();

        let plan = BulkApplyPlan {
            total_rows: 2,
            updates: vec![genre_update(&title, 1, "Mystery"), ghost],
            ..Default::default()
        };
        let report = store.bulk_apply("t1", &plan).unwrap();

        // the healthy sibling still lands
        assert_eq!(report.updated_title_ids, vec![title.id.clone()]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row_number, 2);

        let record = store
            .get_import_record("t1", &report.import_id)
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ImportStatus::Partial);
        assert_eq!(record.error_count, 1);
    }

    #[test]
    fn test_bulk_apply_never_mutates_other_tenants() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let foreign = seed_title(&store, "t2", "978-0-000000-0-1", "Their Book");

        let plan = BulkApplyPlan {
            total_rows: 1,
            updates: vec![genre_update(&foreign, 1, "Mystery")],
            ..Default::default()
        };
        // tenant scoping in the WHERE clause wins even with a valid title id
        let report = store.bulk_apply("t1", &plan).unwrap();
        assert!(report.updated_title_ids.is_empty());
        assert_eq!(report.errors.len(), 1);

        let untouched = store.get_title("t2", &foreign.id).unwrap().unwrap();
        assert_eq!(untouched.genre.as_deref(), Some("Fiction"));
    }

    #[test]
    fn test_bulk_apply_kind_mismatch_rejects_row() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let title = seed_title(&store, "t1", "978-0-000000-0-1", "Book");

        let update = RowUpdate {
            row_number: 1,
            title_id: title.id.clone(),
            isbn: "978-0-000000-0-1".to_string(),
            sets: vec![(
                TitleField::PageCount,
                FieldValue::Text("not a number".to_string()),
            )],
            changes: vec![],
        };
        let plan = BulkApplyPlan {
            total_rows: 1,
            updates: vec![update],
            ..Default::default()
        };
        let report = store.bulk_apply("t1", &plan).unwrap();

        assert!(report.updated_title_ids.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field.as_deref(), Some("page_count"));

        let untouched = store.get_title("t1", &title.id).unwrap().unwrap();
        assert_eq!(untouched.page_count, Some(200));
    }

    #[test]
    fn test_bulk_apply_creates_unmatched_titles() {
        let store = SqliteTitleStore::in_memory().unwrap();

        let create = RowCreate {
            row_number: 1,
            isbn: "978-1-111111-1-1".to_string(),
            fields: vec![
                (TitleField::Title, FieldValue::Text("New Arrival".to_string())),
                (TitleField::Genre, FieldValue::Text("Romance".to_string())),
            ],
        };
        let plan = BulkApplyPlan {
            total_rows: 1,
            creates: vec![create],
            ..Default::default()
        };
        let report = store.bulk_apply("t1", &plan).unwrap();

        assert_eq!(report.created_title_ids.len(), 1);
        let created = store
            .get_title("t1", &report.created_title_ids[0])
            .unwrap()
            .unwrap();
        assert_eq!(created.title, "New Arrival");
        // identifier stored as given, not normalized
        assert_eq!(created.isbn.as_deref(), Some("978-1-111111-1-1"));
        assert_eq!(created.genre.as_deref(), Some("Romance"));
    }

    #[test]
    fn test_bulk_apply_create_without_name_is_a_row_error() {
        let store = SqliteTitleStore::in_memory().unwrap();

        let create = RowCreate {
            row_number: 4,
            isbn: "978-1-111111-1-1".to_string(),
            fields: vec![(TitleField::Genre, FieldValue::Text("Romance".to_string()))],
        };
        let plan = BulkApplyPlan {
            total_rows: 1,
            creates: vec![create],
            ..Default::default()
        };
        let report = store.bulk_apply("t1", &plan).unwrap();

        assert!(report.created_title_ids.is_empty());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row_number, 4);
        assert!(report.errors[0].message.contains("title name"));
    }

    #[test]
    fn test_standalone_import_record() {
        let store = SqliteTitleStore::in_memory().unwrap();
        let mut record = ImportRecord::new("t1", Some("broken.csv".to_string()), None, 10);
        record.status = ImportStatus::Failed;
        record.error_message = Some("transaction aborted".to_string());
        store.create_import_record(&record).unwrap();

        let loaded = store.get_import_record("t1", &record.id).unwrap().unwrap();
        assert_eq!(loaded.status, ImportStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("transaction aborted"));
        assert!(store.get_import_record("t2", &record.id).unwrap().is_none());
    }

    #[test]
    fn test_list_import_records_most_recent_first() {
        let store = SqliteTitleStore::in_memory().unwrap();
        for i in 0..3 {
            let mut record = ImportRecord::new("t1", None, None, i);
            record.created_at = 1_700_000_000_000 + i;
            store.create_import_record(&record).unwrap();
        }

        let records = store.list_import_records("t1", 2).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].created_at >= records[1].created_at);
    }
}
