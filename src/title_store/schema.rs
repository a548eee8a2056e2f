//! Database schema for the title catalog.
//!
//! Two tables:
//! - titles: the tenant-scoped catalog, one row per title
//! - import_records: one row per bulk update invocation, with counts and
//!   the field-level change payload

/// SQL schema for the title database.
pub const TITLE_SCHEMA_SQL: &str = r#"
-- Tenant-scoped catalog of titles
CREATE TABLE IF NOT EXISTS titles (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,

    -- External identifier for CSV matching, stored as given
    isbn TEXT,

    -- Declared fields reachable by bulk updates
    title TEXT NOT NULL,
    subtitle TEXT,
    genre TEXT,
    language TEXT,
    publication_date TEXT,
    page_count INTEGER,
    price REAL,
    description TEXT,
    bisac_codes TEXT NOT NULL DEFAULT '[]',
    keywords TEXT NOT NULL DEFAULT '[]',

    -- Timestamps (Unix milliseconds)
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Bulk update tracking records
CREATE TABLE IF NOT EXISTS import_records (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    filename TEXT,
    column_map TEXT,
    status TEXT NOT NULL,

    -- Outcome counts
    total_rows INTEGER NOT NULL DEFAULT 0,
    updated_count INTEGER NOT NULL DEFAULT 0,
    created_count INTEGER NOT NULL DEFAULT 0,
    skipped_count INTEGER NOT NULL DEFAULT 0,
    error_count INTEGER NOT NULL DEFAULT 0,

    -- Field-level change payload (JSON, one entry per updated title)
    changes TEXT,
    error_message TEXT,

    -- Timestamps (Unix milliseconds)
    created_at INTEGER NOT NULL,
    completed_at INTEGER
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_titles_tenant ON titles(tenant_id);
CREATE INDEX IF NOT EXISTS idx_titles_tenant_isbn ON titles(tenant_id, isbn);
CREATE INDEX IF NOT EXISTS idx_imports_tenant ON import_records(tenant_id);
CREATE INDEX IF NOT EXISTS idx_imports_status ON import_records(status);
"#;
