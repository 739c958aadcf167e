//! Derived node views that need the backend.
//!
//! Health and check report lookups are recovered locally: a node whose
//! backend data cannot be fetched shows up as `Unknown` / no report instead
//! of failing the request it is part of.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::{ControlsReport, HealthCheck, HealthStatus, Node, NodeDetail};
use crate::services::backend::Backend;
use crate::utils::{cancellable, AppError, AppResult};

impl Node {
    /// Raw health checks for this node. Errors propagate.
    pub async fn health_checks(
        &self,
        backend: &Backend,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<HealthCheck>> {
        cancellable(cancel, "health check lookup", backend.health().node_checks(&self.name))
            .await
            .map_err(|e| e.context("could not query Consul for health checks"))
    }

    /// Aggregated health; `Unknown` when the checks cannot be fetched
    pub async fn health(&self, backend: &Backend, cancel: &CancellationToken) -> HealthStatus {
        match self.health_checks(backend, cancel).await {
            Ok(checks) => HealthStatus::aggregate(&checks),
            Err(AppError::Cancelled(_)) => {
                debug!(node = %self.name, "Health lookup cancelled");
                HealthStatus::Unknown
            }
            Err(e) => {
                warn!(node = %self.name, error = %e, "Health lookup failed, status unknown");
                HealthStatus::Unknown
            }
        }
    }

    /// Check report from the node's agent; `None` when it cannot be obtained
    pub async fn checks(
        &self,
        backend: &Backend,
        cancel: &CancellationToken,
    ) -> Option<ControlsReport> {
        let fetch = async {
            let agent = backend.agent();
            let url = agent.resolve_endpoint(backend.catalog(), self).await;
            agent.fetch_controls(&url).await
        };

        match cancellable(cancel, "check report fetch", fetch).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(node = %self.name, error = %e, "No check report available");
                None
            }
        }
    }
}

/// Look up one node with its health checks
pub async fn load_node(
    backend: &Backend,
    name: &str,
    cancel: &CancellationToken,
) -> AppResult<NodeDetail> {
    let node = find_node(backend, name, cancel).await?;
    let checks = node.health_checks(backend, cancel).await?;
    Ok(NodeDetail::new(node, checks))
}

/// Catalog lookup of a single node; absent nodes are `NotFound`
pub async fn find_node(
    backend: &Backend,
    name: &str,
    cancel: &CancellationToken,
) -> AppResult<Node> {
    cancellable(cancel, "node lookup", backend.catalog().node(name))
        .await
        .map_err(|e| e.context(format!("could not query Consul for node '{}'", name)))?
        .map(Node::from)
        .ok_or_else(|| AppError::NotFound(format!("Node '{}' not found", name)))
}
