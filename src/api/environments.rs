//! Environment topology endpoints

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{RawQuery, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::{
    models::{EnvironmentList, FilterVocabulary, HealthFilter, RESERVED_TAG_PREFIX},
    services::{build_filter_expression, load_environments, load_vocabulary},
    utils::{validation::validate_tag_key, with_deadline, AppError, AppResult},
    AppState,
};

/// Query key carrying the accepted health statuses
const HEALTH_PARAM: &str = "health";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_environments))
        .route("/filters", get(get_filters))
}

/// Filters echoed back to the client
#[derive(Debug, Serialize)]
pub struct AppliedFilters {
    pub tags: BTreeMap<String, Vec<String>>,
    pub health: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EnvironmentsResponse {
    pub environments: EnvironmentList,
    pub filters: FilterVocabulary,
    pub applied_filters: AppliedFilters,
}

/// List environments with their nodes
///
/// `trento-*` query keys restrict nodes by metadata (repeated keys are
/// alternatives), `health` restricts them by aggregated health.
async fn list_environments(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> AppResult<Json<EnvironmentsResponse>> {
    let params = group_query(query.as_deref().unwrap_or(""));

    let mut tags: HashMap<String, Vec<String>> = HashMap::new();
    let mut health = Vec::new();
    for (key, values) in params {
        if key == HEALTH_PARAM {
            health.extend(values);
        } else if key.starts_with(RESERVED_TAG_PREFIX) {
            if !validate_tag_key(&key) {
                return Err(AppError::BadRequest(format!("Invalid filter key '{}'", key)));
            }
            tags.insert(key, values);
        }
    }

    let filter = build_filter_expression(&tags);
    let health_filter = HealthFilter::new(&health);
    tracing::debug!(%filter, health = ?health_filter.values(), "Listing environments");

    // Dropping the request future cancels every in-flight backend call
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let backend = &state.backend;
    let (environments, filters) = with_deadline(state.config.server.request_timeout(), &cancel, async {
        let environments = load_environments(backend, &filter, &health_filter, &cancel).await?;
        let filters = load_vocabulary(backend, &cancel).await?;
        Ok((environments, filters))
    })
    .await?;

    Ok(Json(EnvironmentsResponse {
        environments,
        filters,
        applied_filters: AppliedFilters {
            tags: tags.into_iter().collect(),
            health: health_filter.values().to_vec(),
        },
    }))
}

/// Filter vocabularies for the environment view
async fn get_filters(State(state): State<AppState>) -> AppResult<Json<FilterVocabulary>> {
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let vocabulary = with_deadline(
        state.config.server.request_timeout(),
        &cancel,
        load_vocabulary(&state.backend, &cancel),
    )
    .await?;

    Ok(Json(vocabulary))
}

/// Group the pairs of a raw query string by key, in order of first use.
///
/// Empty values are dropped.
fn group_query(raw: &str) -> Vec<(String, Vec<String>)> {
    let mut params: Vec<(String, Vec<String>)> = Vec::new();

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let index = match params.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                params.push((key.into_owned(), Vec::new()));
                params.len() - 1
            }
        };
        if !value.is_empty() {
            params[index].1.push(value.into_owned());
        }
    }

    params
}
