mod bulk_update_routes;
pub mod state;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use bulk_update_routes::bulk_update_routes;
use state::ServerState;

async fn health() -> &'static str {
    "ok"
}

fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/v1/tenants/{tenant_id}/bulk-update", bulk_update_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(state: ServerState, port: u16) -> Result<()> {
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on 127.0.0.1:{}", port);

    Ok(axum::serve(listener, app).await?)
}
