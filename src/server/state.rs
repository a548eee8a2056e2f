use std::sync::Arc;

use axum::extract::FromRef;

use crate::bulk_update::BulkUpdateManager;
use crate::title_store::TitleStore;

pub type GuardedTitleStore = Arc<dyn TitleStore>;
pub type GuardedBulkUpdateManager = Arc<BulkUpdateManager>;

#[derive(Clone)]
pub struct ServerState {
    pub title_store: GuardedTitleStore,
    pub bulk_update_manager: GuardedBulkUpdateManager,
}

impl FromRef<ServerState> for GuardedTitleStore {
    fn from_ref(input: &ServerState) -> Self {
        input.title_store.clone()
    }
}

impl FromRef<ServerState> for GuardedBulkUpdateManager {
    fn from_ref(input: &ServerState) -> Self {
        input.bulk_update_manager.clone()
    }
}
