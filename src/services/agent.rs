//! Client for the check agent running on every node.
//!
//! The agent is located through the Consul catalog when a service name is
//! configured. Nodes that do not register the service fall back to the node
//! address on the configured port.

use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ChecksConfig;
use crate::models::{ControlsReport, Node};
use crate::services::backend::CatalogClient;
use crate::utils::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    port: u16,
    service_name: Option<String>,
}

impl AgentClient {
    pub fn new(config: &ChecksConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .use_rustls_tls()
            .build()
            .context("Failed to create check agent HTTP client")?;

        Ok(Self {
            client,
            port: config.port,
            service_name: config.service_name.clone().filter(|s| !s.is_empty()),
        })
    }

    /// URL of the agent serving `node`'s check report
    pub async fn resolve_endpoint(&self, catalog: &dyn CatalogClient, node: &Node) -> String {
        if let Some(ref service) = self.service_name {
            match catalog.service_instances(service).await {
                Ok(instances) => {
                    if let Some(instance) = instances.iter().find(|i| i.node == node.name) {
                        let url = endpoint_url(instance.effective_address(), instance.service_port);
                        debug!(node = %node.name, %url, "Resolved check agent through catalog");
                        return url;
                    }
                    debug!(
                        node = %node.name,
                        service = %service,
                        "Check agent service not registered for node, using node address"
                    );
                }
                Err(e) => {
                    warn!(
                        node = %node.name,
                        service = %service,
                        error = %e,
                        "Could not resolve check agent through catalog, using node address"
                    );
                }
            }
        }

        endpoint_url(&node.address, self.port)
    }

    /// Fetch and decode the controls report served at `url`
    pub async fn fetch_controls(&self, url: &str) -> AppResult<ControlsReport> {
        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::from(e).context(format!("could not reach check agent at {}", url))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::BackendUnavailable(format!(
                "check agent at {} returned {}",
                url, status
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            AppError::BackendUnavailable(format!("failed to read check agent response: {}", e))
        })?;

        serde_json::from_slice(&body)
            .map_err(|e| AppError::DecodeFailure(format!("check agent at {} sent an invalid report: {}", url, e)))
    }
}

fn endpoint_url(address: &str, port: u16) -> String {
    // Bare IPv6 addresses need brackets in a URL authority
    if address.contains(':') && !address.starts_with('[') {
        format!("http://[{}]:{}/", address, port)
    } else {
        format!("http://{}:{}/", address, port)
    }
}
