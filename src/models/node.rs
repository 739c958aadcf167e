//! Node data model

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::{HealthCheck, HealthStatus};

/// Metadata keys carrying this prefix are the only ones exposed or filterable
pub const RESERVED_TAG_PREFIX: &str = "trento-";

/// Consul encodes empty maps as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A node record as returned by the Consul catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogNode {
    /// Node UUID
    #[serde(rename = "ID", default)]
    pub id: String,

    /// Node name (unique identifier)
    pub node: String,

    /// Address the node registered with
    #[serde(default)]
    pub address: String,

    /// Datacenter the node belongs to
    #[serde(default)]
    pub datacenter: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tagged_addresses: BTreeMap<String, String>,

    /// Arbitrary node metadata
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: BTreeMap<String, String>,
}

/// One registered instance of a service, from `/v1/catalog/service/<name>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceInstance {
    pub node: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub datacenter: String,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    /// Empty when the service uses the node address
    #[serde(default)]
    pub service_address: String,
    #[serde(default)]
    pub service_port: u16,
}

impl ServiceInstance {
    /// Address to dial, preferring the service-specific one
    pub fn effective_address(&self) -> &str {
        if self.service_address.is_empty() {
            &self.address
        } else {
            &self.service_address
        }
    }
}

/// A managed host within one environment.
///
/// This is a plain value. Views that need the backend (health, check report)
/// take a [`crate::services::Backend`] explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub address: String,
    pub datacenter: String,
    pub meta: BTreeMap<String, String>,
    /// Aggregated health, set only when a health filter made the load compute it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthStatus>,
}

impl Node {
    /// Metadata restricted to the reserved tag namespace
    pub fn reserved_meta(&self) -> BTreeMap<String, String> {
        self.meta
            .iter()
            .filter(|(key, _)| key.starts_with(RESERVED_TAG_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl From<CatalogNode> for Node {
    fn from(node: CatalogNode) -> Self {
        Self {
            id: node.id,
            name: node.node,
            address: node.address,
            datacenter: node.datacenter,
            meta: node.meta,
            health: None,
        }
    }
}

/// How a node is listed inside an environment
#[derive(Debug, Serialize)]
pub struct NodeSummary<'a> {
    #[serde(flatten)]
    pub node: &'a Node,
    pub reserved_meta: BTreeMap<String, String>,
}

impl<'a> From<&'a Node> for NodeSummary<'a> {
    fn from(node: &'a Node) -> Self {
        Self {
            reserved_meta: node.reserved_meta(),
            node,
        }
    }
}

/// Everything the node detail view shows
#[derive(Debug, Clone, Serialize)]
pub struct NodeDetail {
    pub node: Node,
    pub health: HealthStatus,
    pub reserved_meta: BTreeMap<String, String>,
    pub health_checks: Vec<HealthCheck>,
}

impl NodeDetail {
    pub fn new(node: Node, health_checks: Vec<HealthCheck>) -> Self {
        Self {
            health: HealthStatus::aggregate(&health_checks),
            reserved_meta: node.reserved_meta(),
            node,
            health_checks,
        }
    }
}
