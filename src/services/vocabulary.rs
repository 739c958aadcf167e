//! Filter vocabulary loader

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::models::{FilterName, FilterVocabulary};
use crate::services::backend::KvClient;
use crate::services::Backend;
use crate::utils::{cancellable, AppError, AppResult};

/// Load every known vocabulary; any failure yields no vocabulary at all
pub async fn load_vocabulary(
    backend: &Backend,
    cancel: &CancellationToken,
) -> AppResult<FilterVocabulary> {
    let lookups = FilterName::ALL.map(|name| async move {
        let values = load_filter(backend.kv(), name).await?;
        Ok::<_, AppError>((name, values))
    });

    let entries = cancellable(cancel, "filter vocabulary load", try_join_all(lookups)).await?;
    Ok(entries.into_iter().collect())
}

/// Read and decode one vocabulary
async fn load_filter(kv: &dyn KvClient, name: FilterName) -> AppResult<Vec<String>> {
    let key = name.kv_key();
    let raw = kv
        .get(&key)
        .await
        .map_err(|e| e.context("could not query Consul for filters on the KV storage"))?
        .ok_or_else(|| AppError::NotFound(format!("filter vocabulary '{}' is missing from the KV storage", key)))?;

    let values: Vec<String> = serde_json::from_slice(&raw).map_err(|e| {
        AppError::DecodeFailure(format!("error decoding the filter data at '{}': {}", key, e))
    })?;

    debug!(filter = %name, values = values.len(), "Loaded filter vocabulary");
    Ok(values)
}
