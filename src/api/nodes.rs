//! Node endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::{ControlCheck, ControlsReport, NodeDetail},
    services::{find_node, load_node},
    utils::{validation::validate_node_name, with_deadline, AppError, AppResult},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{name}", get(get_node))
        .route("/{name}/checks", get(get_node_checks))
        .route("/{name}/checks/{check_id}", get(get_node_check))
}

/// Get a node with its health checks
async fn get_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<NodeDetail>> {
    ensure_valid_name(&name)?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let detail = with_deadline(
        state.config.server.request_timeout(),
        &cancel,
        load_node(&state.backend, &name, &cancel),
    )
    .await?;

    Ok(Json(detail))
}

/// Get the detailed check report served by the node's agent
async fn get_node_checks(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ControlsReport>> {
    fetch_report(&state, &name).await.map(Json)
}

/// Get one check of the node's report
async fn get_node_check(
    State(state): State<AppState>,
    Path((name, check_id)): Path<(String, String)>,
) -> AppResult<Json<ControlCheck>> {
    let report = fetch_report(&state, &name).await?;

    report.find_check(&check_id).cloned().map(Json).ok_or_else(|| {
        AppError::NotFound(format!("Node '{}' has no check '{}'", name, check_id))
    })
}

async fn fetch_report(state: &AppState, name: &str) -> AppResult<ControlsReport> {
    ensure_valid_name(name)?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let backend = &state.backend;

    let report = with_deadline(state.config.server.request_timeout(), &cancel, async {
        let node = find_node(backend, name, &cancel).await?;
        Ok(node.checks(backend, &cancel).await)
    })
    .await?;

    report.ok_or_else(|| AppError::NotFound(format!("No check report available for node '{}'", name)))
}

fn ensure_valid_name(name: &str) -> AppResult<()> {
    if validate_node_name(name) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid node name '{}'", name)))
    }
}
