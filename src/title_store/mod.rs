mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    BulkApplyPlan, BulkApplyReport, ImportRecord, ImportStatus, RowCreate, RowUpdate, Title,
};
pub use schema::TITLE_SCHEMA_SQL;
pub use store::SqliteTitleStore;
pub use trait_def::TitleStore;
