//! Capability traits for the discovery backend and the handle that bundles them.
//!
//! The core only ever talks to these traits. [`ConsulClient`] implements all
//! three against the Consul HTTP API; tests substitute in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{CatalogNode, HealthCheck, ServiceInstance};
use crate::services::agent::AgentClient;
use crate::services::consul::ConsulClient;
use crate::utils::error::AppResult;

/// Catalog queries: datacenters, nodes and service instances
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Datacenter names, in the order the backend reports them
    async fn datacenters(&self) -> AppResult<Vec<String>>;

    /// Nodes matching a filter expression; an empty expression matches all
    async fn nodes(&self, filter: &str) -> AppResult<Vec<CatalogNode>>;

    /// A single node, `None` when it is not registered
    async fn node(&self, name: &str) -> AppResult<Option<CatalogNode>>;

    /// Every registered instance of a service
    async fn service_instances(&self, service: &str) -> AppResult<Vec<ServiceInstance>>;
}

/// Per-node health checks
#[async_trait]
pub trait HealthClient: Send + Sync {
    async fn node_checks(&self, node: &str) -> AppResult<Vec<HealthCheck>>;
}

/// Raw key/value reads
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Raw value at `key`, `None` when the key does not exist
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;
}

/// Read-only handle on every backend collaborator a request needs.
///
/// Cheap to clone; shared by all in-flight requests.
#[derive(Clone)]
pub struct Backend {
    catalog: Arc<dyn CatalogClient>,
    health: Arc<dyn HealthClient>,
    kv: Arc<dyn KvClient>,
    agent: AgentClient,
    health_concurrency: usize,
}

impl Backend {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        health: Arc<dyn HealthClient>,
        kv: Arc<dyn KvClient>,
        agent: AgentClient,
    ) -> Self {
        Self {
            catalog,
            health,
            kv,
            agent,
            health_concurrency: 8,
        }
    }

    /// Use one Consul client for catalog, health and KV
    pub fn from_consul(consul: Arc<ConsulClient>, agent: AgentClient) -> Self {
        Self::new(consul.clone(), consul.clone(), consul, agent)
    }

    /// Bound the number of concurrent per-node health lookups
    pub fn with_health_concurrency(mut self, limit: usize) -> Self {
        self.health_concurrency = limit.max(1);
        self
    }

    pub fn catalog(&self) -> &dyn CatalogClient {
        self.catalog.as_ref()
    }

    pub fn health(&self) -> &dyn HealthClient {
        self.health.as_ref()
    }

    pub fn kv(&self) -> &dyn KvClient {
        self.kv.as_ref()
    }

    pub fn agent(&self) -> &AgentClient {
        &self.agent
    }

    pub fn health_concurrency(&self) -> usize {
        self.health_concurrency
    }
}
