//! Environment data model

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{Node, NodeSummary};
use crate::utils::error::{AppError, AppResult};

/// A named group of nodes, one per Consul datacenter
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Environment {
    pub name: String,
    /// Nodes in catalog discovery order
    #[serde(serialize_with = "serialize_summaries")]
    pub nodes: Vec<Node>,
}

fn serialize_summaries<S: Serializer>(nodes: &[Node], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(nodes.iter().map(NodeSummary::from))
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }
}

/// Environments keyed by name, in the order the datacenters were reported.
///
/// Serialises as a JSON object whose key order follows that same order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentList {
    environments: Vec<Environment>,
}

impl EnvironmentList {
    /// One empty environment per datacenter; duplicate names collapse.
    pub fn seeded<I, S>(datacenters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for dc in datacenters {
            let dc = dc.into();
            if list.get(&dc).is_none() {
                list.environments.push(Environment::new(dc));
            }
        }
        list
    }

    pub fn get(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|env| env.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Attach a node to the environment of its datacenter.
    ///
    /// A datacenter that was never seeded means the catalog contradicted its
    /// own datacenter list; that is reported rather than papered over.
    pub fn push_node(&mut self, node: Node) -> AppResult<()> {
        match self
            .environments
            .iter_mut()
            .find(|env| env.name == node.datacenter)
        {
            Some(env) => {
                env.nodes.push(node);
                Ok(())
            }
            None => Err(AppError::Inconsistent(format!(
                "node '{}' reports datacenter '{}' which is not in the datacenter list",
                node.name, node.datacenter
            ))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.environments.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.environments.iter().map(|env| env.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    /// Total number of nodes across all environments
    pub fn node_count(&self) -> usize {
        self.environments.iter().map(|env| env.nodes.len()).sum()
    }
}

impl IntoIterator for EnvironmentList {
    type Item = Environment;
    type IntoIter = std::vec::IntoIter<Environment>;

    fn into_iter(self) -> Self::IntoIter {
        self.environments.into_iter()
    }
}

impl Serialize for EnvironmentList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.environments.len()))?;
        for env in &self.environments {
            map.serialize_entry(&env.name, env)?;
        }
        map.end()
    }
}
