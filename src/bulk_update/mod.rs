mod diff;
mod fields;
mod isbn;
mod manager;
mod matcher;
mod models;

pub use diff::{compute_diff, FieldChange, TitleDiff};
pub use fields::{mapping_for, FieldKind, FieldMapping, TitleField, FIELD_MAPPINGS};
pub use isbn::normalize_isbn;
pub use manager::BulkUpdateManager;
pub use matcher::match_by_isbn;
pub use models::{
    BulkUpdateOptions, BulkUpdateResult, FieldValue, IncomingRow, MatchError, MatchResult,
    RowError, TitleMatch,
};
