//! Bulk update HTTP routes.
//!
//! Provides endpoints for:
//! - Matching uploaded rows against the tenant catalog
//! - Applying a reviewed selection of changes
//! - Inspecting import tracking records

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bulk_update::{BulkUpdateOptions, IncomingRow, TitleMatch};
use crate::server::state::{GuardedBulkUpdateManager, GuardedTitleStore, ServerState};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request body for the match phase.
#[derive(Debug, Deserialize)]
pub struct MatchBody {
    pub rows: Vec<IncomingRow>,
}

/// Request body for the apply phase: the reviewed matches (with their
/// selection flags) plus apply options.
#[derive(Debug, Deserialize)]
pub struct ApplyBody {
    pub matches: Vec<TitleMatch>,
    #[serde(default)]
    pub options: BulkUpdateOptions,
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /match - Resolve uploaded rows against the tenant catalog
async fn match_rows(
    State(manager): State<GuardedBulkUpdateManager>,
    Path(tenant_id): Path<String>,
    Json(body): Json<MatchBody>,
) -> impl IntoResponse {
    match manager.match_rows(&tenant_id, &body.rows) {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            warn!("Failed to match rows for tenant {}: {:#}", tenant_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to match rows".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /apply - Apply the reviewed selection in one transaction
async fn apply_bulk_update(
    State(manager): State<GuardedBulkUpdateManager>,
    Path(tenant_id): Path<String>,
    Json(body): Json<ApplyBody>,
) -> impl IntoResponse {
    let result = manager.apply_bulk_update(&tenant_id, &body.matches, &body.options);
    info!(
        "Applied bulk update for tenant {}: success={} updated={} created={}",
        tenant_id, result.success, result.updated_count, result.created_count
    );
    Json(result).into_response()
}

/// GET /imports - List the tenant's import records, most recent first
async fn list_imports(
    State(store): State<GuardedTitleStore>,
    Path(tenant_id): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> impl IntoResponse {
    match store.list_import_records(&tenant_id, pagination.limit) {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            warn!("Failed to list imports for tenant {}: {:#}", tenant_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to list imports".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /imports/{id} - Get one import record
async fn get_import(
    State(store): State<GuardedTitleStore>,
    Path((tenant_id, import_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match store.get_import_record(&tenant_id, &import_id) {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(
                "Failed to get import {} for tenant {}: {:#}",
                import_id, tenant_id, e
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to get import").into_response()
        }
    }
}

// =============================================================================
// Router Construction
// =============================================================================

/// Build the bulk update routes, nested under a tenant path.
///
/// - POST /match - Resolve rows against the catalog
/// - POST /apply - Apply the reviewed selection
/// - GET /imports - List import records
/// - GET /imports/{id} - Get one import record
pub fn bulk_update_routes() -> Router<ServerState> {
    Router::new()
        .route("/match", post(match_rows))
        .route("/apply", post(apply_bulk_update))
        .route("/imports", get(list_imports))
        .route("/imports/{id}", get(get_import))
}
