//! Inkpress Title Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod bulk_update;
pub mod config;
pub mod server;
pub mod title_store;

// Re-export commonly used types for convenience
pub use bulk_update::{BulkUpdateManager, BulkUpdateOptions, BulkUpdateResult, MatchResult};
pub use server::run_server;
pub use title_store::{SqliteTitleStore, TitleStore};
