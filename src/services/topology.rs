//! Environment topology loader
//!
//! Joins the catalog datacenter list with the (filtered) node list and,
//! when a health filter is given, with each node's aggregated health.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::{EnvironmentList, HealthFilter, HealthStatus, Node};
use crate::services::backend::Backend;
use crate::utils::{cancellable, AppError, AppResult};

/// Build the environment tree for one request.
///
/// Datacenter and node listing failures are fatal. Per-node health failures
/// only make that node `Unknown`. Node order inside an environment follows
/// catalog order.
pub async fn load_environments(
    backend: &Backend,
    filter: &str,
    health_filter: &HealthFilter,
    cancel: &CancellationToken,
) -> AppResult<EnvironmentList> {
    let datacenters = cancellable(cancel, "datacenter listing", backend.catalog().datacenters())
        .await
        .map_err(|e| e.context("could not query Consul for datacenters"))?;

    let mut environments = EnvironmentList::seeded(datacenters);

    let records = cancellable(cancel, "node listing", backend.catalog().nodes(filter))
        .await
        .map_err(|e| e.context("could not query Consul for nodes"))?;

    let nodes: Vec<Node> = records.into_iter().map(Node::from).collect();

    // Reject inconsistent catalog answers before spending any health lookups
    if let Some(stray) = nodes.iter().find(|n| !environments.contains(&n.datacenter)) {
        return Err(AppError::Inconsistent(format!(
            "node '{}' reports datacenter '{}' which is not in the datacenter list",
            stray.name, stray.datacenter
        )));
    }

    let total = nodes.len();
    let included = if health_filter.is_empty() {
        nodes
    } else {
        filter_by_health(backend, nodes, health_filter, cancel).await?
    };

    for node in included {
        environments.push_node(node)?;
    }

    info!(
        environments = environments.len(),
        nodes = environments.node_count(),
        discovered = total,
        filtered = !filter.is_empty(),
        "Loaded environment topology"
    );

    Ok(environments)
}

/// Keep nodes whose aggregated health the filter accepts, preserving order.
///
/// Kept nodes carry the status they were judged by.
async fn filter_by_health(
    backend: &Backend,
    nodes: Vec<Node>,
    health_filter: &HealthFilter,
    cancel: &CancellationToken,
) -> AppResult<Vec<Node>> {
    let lookups: Vec<_> = nodes.iter().map(|node| node.health(backend, cancel)).collect();

    // `buffered` yields in input order regardless of completion order
    let statuses: Vec<HealthStatus> = stream::iter(lookups)
        .buffered(backend.health_concurrency())
        .collect()
        .await;

    if cancel.is_cancelled() {
        return Err(AppError::Cancelled(
            "environment topology load was cancelled".to_string(),
        ));
    }

    Ok(nodes
        .into_iter()
        .zip(statuses)
        .filter_map(|(mut node, status)| {
            if health_filter.accepts(status) {
                node.health = Some(status);
                Some(node)
            } else {
                debug!(node = %node.name, %status, "Excluded by health filter");
                None
            }
        })
        .collect())
}
