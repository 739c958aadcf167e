//! Business logic services

pub mod agent;
pub mod backend;
pub mod consul;
pub mod facade;
pub mod filter_query;
pub mod topology;
pub mod vocabulary;

pub use agent::AgentClient;
pub use backend::{Backend, CatalogClient, HealthClient, KvClient};
pub use consul::ConsulClient;
pub use facade::{find_node, load_node};
pub use filter_query::{build_filter_expression, FilterQuery};
pub use topology::load_environments;
pub use vocabulary::load_vocabulary;
